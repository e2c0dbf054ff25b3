use anyhow::Context;
use axum::extract::Multipart;
use bytes::Bytes;
use uuid::Uuid;

use crate::error::ApiError;
use crate::posts::repo::Post;
use crate::state::AppState;
use crate::storage::ext_from_mime;

/// Ownership gate: only the recorded author may mutate a post. Reads are
/// open to any authenticated identity.
pub fn can_mutate(user_id: Uuid, post: &Post) -> bool {
    post.author_id == user_id
}

/// Fields accepted from the multipart body on create and update. Anything
/// that names the author is ignored; the creating identity is authoritative.
#[derive(Debug, Default)]
pub struct PostForm {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image: Option<(Bytes, String)>,
}

pub async fn collect_post_form(mp: &mut Multipart) -> Result<PostForm, ApiError> {
    let mut form = PostForm::default();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("title") => {
                form.title = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::Validation(format!("invalid title field: {e}")))?,
                );
            }
            Some("content") => {
                form.content = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::Validation(format!("invalid content field: {e}")))?,
                );
            }
            Some("image") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("invalid image field: {e}")))?;
                form.image = Some((data, content_type));
            }
            _ => {}
        }
    }
    Ok(form)
}

/// Upload a post image and return its object key. The key embeds a fresh
/// UUID so a replacement never collides with the object it supersedes.
pub async fn store_image(
    st: &AppState,
    author_id: Uuid,
    post_id: Uuid,
    body: Bytes,
    content_type: &str,
) -> Result<String, ApiError> {
    let ext = ext_from_mime(content_type)
        .ok_or_else(|| ApiError::Validation(format!("unsupported image type: {content_type}")))?;
    let key = format!("blog_images/{}/{}-{}.{}", author_id, post_id, Uuid::new_v4(), ext);
    st.storage
        .put(&key, body, content_type)
        .await
        .with_context(|| format!("upload image {key}"))?;
    Ok(key)
}

/// Presigned GET for a post's image, if it has one.
pub async fn image_url(st: &AppState, post: &Post) -> anyhow::Result<Option<String>> {
    const URL_TTL_SECS: u64 = 600;
    match &post.image_key {
        Some(key) => Ok(Some(st.storage.presigned_url(key, URL_TTL_SECS).await?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod gate_tests {
    use super::*;
    use time::OffsetDateTime;

    fn post_by(author_id: Uuid) -> Post {
        Post {
            id: Uuid::new_v4(),
            author_id,
            title: "t".into(),
            content: "c".into(),
            image_key: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn author_may_mutate_own_post() {
        let author = Uuid::new_v4();
        assert!(can_mutate(author, &post_by(author)));
    }

    #[test]
    fn any_other_identity_is_rejected() {
        let author = Uuid::new_v4();
        let post = post_by(author);
        for _ in 0..16 {
            assert!(!can_mutate(Uuid::new_v4(), &post));
        }
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;

    #[tokio::test]
    async fn store_image_rejects_non_image_content() {
        let st = AppState::fake();
        let err = store_image(
            &st,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Bytes::from_static(b"%PDF-1.4"),
            "application/pdf",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn store_image_returns_namespaced_key() {
        let st = AppState::fake();
        let author = Uuid::new_v4();
        let post = Uuid::new_v4();
        let key = store_image(&st, author, post, Bytes::from_static(&[0xFF, 0xD8]), "image/jpeg")
            .await
            .expect("fake storage accepts uploads");
        assert!(key.starts_with(&format!("blog_images/{author}/{post}-")));
        assert!(key.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn image_url_is_none_without_an_image() {
        let st = AppState::fake();
        let post = Post {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            title: "t".into(),
            content: "c".into(),
            image_key: None,
            created_at: time::OffsetDateTime::now_utc(),
        };
        assert!(image_url(&st, &post).await.unwrap().is_none());
    }
}
