use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::posts::repo::Post;

/// Post as returned to clients. `image` is a presigned URL and disappears
/// from the JSON entirely when the post has no image.
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub author: Uuid,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl PostResponse {
    pub fn from_post(post: Post, image_url: Option<String>) -> Self {
        Self {
            id: post.id,
            author: post.author_id,
            title: post.title,
            content: post.content,
            image: image_url,
            created_at: post.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post(image_key: Option<&str>) -> Post {
        Post {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            title: "Hello".into(),
            content: "World".into(),
            image_key: image_key.map(Into::into),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn image_field_omitted_when_absent() {
        let json =
            serde_json::to_string(&PostResponse::from_post(sample_post(None), None)).unwrap();
        assert!(!json.contains("\"image\""));
    }

    #[test]
    fn image_field_present_when_set() {
        let json = serde_json::to_string(&PostResponse::from_post(
            sample_post(Some("blog_images/k.jpg")),
            Some("https://media.local/blog_images/k.jpg".into()),
        ))
        .unwrap();
        assert!(json.contains("https://media.local/blog_images/k.jpg"));
    }
}
