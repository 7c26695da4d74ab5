use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct SeriesRecord {
    pub id: i64,
    pub title: String,
    pub year: Option<u16>,
    #[serde(default)]
    pub status: String,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct MovieRecord {
    pub id: i64,
    pub title: String,
    pub year: Option<u16>,
}
