use std::collections::HashSet;

use once_cell::sync::Lazy;
use uuid::Uuid;

use crate::auth::ownership;
use crate::errors::AppError;
use crate::store::{PostRow, Store};

pub const MAX_POST_CHARS: usize = 140;

const MASK: &str = "****";

static BLOCKED_WORDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["kerfuffle", "sharbert", "fornax"].into_iter().collect());

/// Replace blocked words with `****`. Words are split on single spaces and
/// matched case-insensitively; attached punctuation defeats the match.
pub fn mask_blocked_words(body: &str) -> String {
    body.split(' ')
        .map(|word| {
            if BLOCKED_WORDS.contains(word.to_lowercase().as_str()) {
                MASK
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub async fn create_post(store: &dyn Store, caller: Uuid, body: &str) -> Result<PostRow, AppError> {
    let len = body.chars().count();
    if len == 0 || len > MAX_POST_CHARS {
        return Err(AppError::BadRequest(format!(
            "post body must be 1-{} characters",
            MAX_POST_CHARS
        )));
    }
    let post = store.create_post(caller, &mask_blocked_words(body)).await?;
    tracing::debug!(user_id = %caller, post_id = %post.id, "post created");
    Ok(post)
}

/// Delete a post on behalf of `caller`, who must be its author.
pub async fn delete_post(store: &dyn Store, caller: Uuid, post_id: Uuid) -> Result<(), AppError> {
    let post = store.get_post(post_id).await?.ok_or(AppError::NotFound)?;

    if let Err(denied) = ownership::authorize(caller, post.user_id) {
        tracing::warn!(user_id = %caller, post_id = %post_id, "delete denied: not the author");
        return Err(denied.into());
    }

    // A concurrent delete by the author may already have removed it.
    if !store.delete_post(post_id, caller).await? {
        return Err(AppError::NotFound);
    }
    tracing::debug!(user_id = %caller, post_id = %post_id, "post deleted");
    Ok(())
}
