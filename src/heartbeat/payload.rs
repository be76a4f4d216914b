use serde::{Deserialize, Serialize};

/// Where a reader currently is. Every change is a new logical session as far
/// as reporting is concerned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCoordinates {
    pub content_id: String,
    pub chapter_number: Option<u32>,
    pub page_number: u32,
    pub genre: Option<String>,
}

impl SessionCoordinates {
    pub fn new(content_id: impl Into<String>, chapter_number: Option<u32>) -> Self {
        Self {
            content_id: content_id.into(),
            chapter_number,
            page_number: 1,
            genre: None,
        }
    }

    pub fn with_page(mut self, page_number: u32) -> Self {
        self.page_number = page_number;
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    /// A session is reportable only with a non-empty content id and a chapter.
    pub fn is_reportable(&self) -> bool {
        !self.content_id.trim().is_empty() && self.chapter_number.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatPayload {
    #[serde(rename = "mangaId")]
    pub content_id: String,
    pub chapter_number: u32,
    pub page_number: u32,
    pub genre: Option<String>,
}

impl HeartbeatPayload {
    pub fn from_coordinates(coordinates: &SessionCoordinates) -> Option<Self> {
        if !coordinates.is_reportable() {
            return None;
        }

        Some(Self {
            content_id: coordinates.content_id.clone(),
            chapter_number: coordinates.chapter_number?,
            page_number: coordinates.page_number,
            genre: coordinates.genre.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_collector_field_names() {
        let coords = SessionCoordinates::new("m1", Some(3))
            .with_page(7)
            .with_genre("seinen");
        let payload = HeartbeatPayload::from_coordinates(&coords).unwrap();

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "mangaId": "m1",
                "chapterNumber": 3,
                "pageNumber": 7,
                "genre": "seinen"
            })
        );
    }

    #[test]
    fn absent_genre_is_sent_as_null() {
        let payload =
            HeartbeatPayload::from_coordinates(&SessionCoordinates::new("m1", Some(1))).unwrap();
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("genre").unwrap().is_null());
    }

    #[test]
    fn missing_identity_builds_nothing() {
        assert!(HeartbeatPayload::from_coordinates(&SessionCoordinates::new("m1", None)).is_none());
        assert!(HeartbeatPayload::from_coordinates(&SessionCoordinates::new("  ", Some(2))).is_none());
    }
}
