/// Database row types. These map directly to SQLite rows.
/// Distinct from solace-types models to keep the DB layer independent.

pub struct ProfileRow {
    pub id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub availability: Option<String>,
    /// JSON array text.
    pub support_preferences: String,
    pub support_type: Option<String>,
    pub last_active: Option<String>,
    pub rating: Option<f64>,
    pub is_certified: Option<bool>,
    pub people_supported: Option<i64>,
    pub journey_note: Option<String>,
}

/// User-writable profile fields. Rating, certification and the supported
/// counter are maintained elsewhere and never overwritten by an upsert.
pub struct ProfileUpsert<'a> {
    pub id: &'a str,
    pub display_name: &'a str,
    pub avatar_url: Option<&'a str>,
    pub location: Option<&'a str>,
    pub availability: Option<&'a str>,
    pub support_preferences: &'a [String],
    pub support_type: &'a str,
    pub journey_note: Option<&'a str>,
}

pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub content: String,
    pub created_at: String,
}
