//! Key layout (spec section 6).

pub fn post_stats_key(post_id: i64) -> String {
    format!("post:stats:{post_id}")
}

pub fn comment_stats_key(comment_id: i64) -> String {
    format!("comment:stats:{comment_id}")
}

pub fn post_action_key(user_id: i64, post_id: i64) -> String {
    format!("post:action:{user_id}:{post_id}")
}

pub fn comment_action_key(user_id: i64, comment_id: i64) -> String {
    format!("comment:action:{user_id}:{comment_id}")
}

pub const POST_DIRTY_SET: &str = "post:dirty:set";
pub const COMMENT_DIRTY_SET: &str = "comment:dirty:set";
