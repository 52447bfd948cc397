//! Entry parameter parsing and client/pro role classification.
//!
//! A browser context learns everything about its role from its entry
//! parameters (the page query string). No network access happens here.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Value of `pro_id` that means "no particular professional".
pub const PLACEHOLDER_PRO_ID: &str = "default";

/// Entry parameter keys understood by the router.
pub mod keys {
    pub const PRO_ID: &str = "pro_id";
    pub const BOOKING_ID: &str = "booking_id";
    pub const ROOM_ID: &str = "room_id";
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const AUTO_JOIN: &str = "auto_join";
}

/// Page entry parameters. Blank values are dropped on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryParams {
    values: HashMap<String, String>,
}

impl EntryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` query string.
    ///
    /// A leading `?` is accepted. When a key repeats, the first value wins,
    /// matching `URLSearchParams::get`. A blank first value still shadows
    /// later ones, so the key reads as absent.
    pub fn from_query(query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        let mut params = Self::new();
        let mut seen = HashSet::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if seen.insert(key.clone().into_owned()) {
                params.insert(key, value);
            }
        }
        params
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.insert(key, value);
        }
        params
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        let value = value.trim();
        if !value.is_empty() {
            self.values.insert(key.into(), value.to_string());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Role of the current browser context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Joins a room created by the professional.
    #[default]
    Client,
    /// Hosts the room and publishes its code.
    Pro,
}

/// Declaratively tagged UI groups toggled by the classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityGroup {
    ProViewOnly,
    ClientViewOnly,
}

impl VisibilityGroup {
    /// Class marker used by the page markup.
    pub const fn class_name(&self) -> &'static str {
        match self {
            Self::ProViewOnly => "pro-view-only",
            Self::ClientViewOnly => "client-view-only",
        }
    }
}

/// Outcome of classifying a set of entry parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewClassification {
    pub view: View,
    pub booking_id: Option<String>,
    pub pro_id: Option<String>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub auto_join: bool,
}

impl ViewClassification {
    pub fn is_client(&self) -> bool {
        self.view == View::Client
    }

    pub fn is_pro(&self) -> bool {
        self.view == View::Pro
    }

    pub fn is_group_visible(&self, group: VisibilityGroup) -> bool {
        match group {
            VisibilityGroup::ProViewOnly => self.is_pro(),
            VisibilityGroup::ClientViewOnly => self.is_client(),
        }
    }
}

/// Classify entry parameters into a view and an active booking id.
///
/// `pro` requires a real `pro_id` together with a `booking_id`; anything else
/// is `client`. The booking id is taken from `booking_id`, then `room_id`,
/// then a non-placeholder `pro_id`.
pub fn classify(params: &EntryParams) -> ViewClassification {
    let pro_id = params.get(keys::PRO_ID);
    let real_pro_id = pro_id.filter(|id| *id != PLACEHOLDER_PRO_ID);
    let explicit_booking = params.get(keys::BOOKING_ID);

    let view = if real_pro_id.is_some() && explicit_booking.is_some() {
        View::Pro
    } else {
        View::Client
    };

    let booking_id = explicit_booking
        .or_else(|| params.get(keys::ROOM_ID))
        .or(real_pro_id)
        .map(str::to_string);

    ViewClassification {
        view,
        booking_id,
        pro_id: pro_id.map(str::to_string),
        client_name: params.get(keys::NAME).map(str::to_string),
        client_email: params.get(keys::EMAIL).map(str::to_string),
        auto_join: params.get(keys::AUTO_JOIN) == Some("true"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOKING: &str = "3f2504e0-4f89-41d3-9a0c-0305e82c3301";

    #[test]
    fn pro_needs_real_pro_id_and_booking_id() {
        let c = classify(&EntryParams::from_pairs([
            ("pro_id", "pro-7"),
            ("booking_id", BOOKING),
        ]));
        assert_eq!(c.view, View::Pro);
        assert_eq!(c.booking_id.as_deref(), Some(BOOKING));
        assert_eq!(c.pro_id.as_deref(), Some("pro-7"));
    }

    #[test]
    fn placeholder_pro_id_stays_client() {
        let c = classify(&EntryParams::from_pairs([
            ("pro_id", "default"),
            ("booking_id", BOOKING),
        ]));
        assert_eq!(c.view, View::Client);
        assert_eq!(c.booking_id.as_deref(), Some(BOOKING));
    }

    #[test]
    fn pro_id_without_booking_is_client_keyed_by_pro_id() {
        let c = classify(&EntryParams::from_pairs([("pro_id", "pro-7")]));
        assert_eq!(c.view, View::Client);
        assert_eq!(c.booking_id.as_deref(), Some("pro-7"));
    }

    #[test]
    fn booking_id_resolution_order() {
        let c = classify(&EntryParams::from_pairs([
            ("room_id", "room-1"),
            ("booking_id", "booking-1"),
        ]));
        assert_eq!(c.booking_id.as_deref(), Some("booking-1"));

        let c = classify(&EntryParams::from_pairs([
            ("room_id", "room-1"),
            ("pro_id", "pro-1"),
        ]));
        assert_eq!(c.booking_id.as_deref(), Some("room-1"));

        let c = classify(&EntryParams::from_pairs([("pro_id", "default")]));
        assert_eq!(c.booking_id, None);
    }

    #[test]
    fn empty_params_default_to_client_without_booking() {
        let c = classify(&EntryParams::new());
        assert_eq!(c, ViewClassification::default());
        assert!(c.is_client());
        assert!(!c.auto_join);
    }

    #[test]
    fn query_string_decoding() {
        let params = EntryParams::from_query("?room_id=r%2D1&name=Ada+Lovelace&email=&auto_join=true");
        let c = classify(&params);
        assert_eq!(c.booking_id.as_deref(), Some("r-1"));
        assert_eq!(c.client_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(c.client_email, None);
        assert!(c.auto_join);
    }

    #[test]
    fn auto_join_requires_literal_true() {
        let c = classify(&EntryParams::from_query("room_id=r1&auto_join=1"));
        assert!(!c.auto_join);
    }

    #[test]
    fn first_repeated_key_wins() {
        let params = EntryParams::from_query("booking_id=a&booking_id=b");
        assert_eq!(params.get("booking_id"), Some("a"));
    }

    #[test]
    fn blank_first_value_shadows_later_ones() {
        let params = EntryParams::from_query("booking_id=&booking_id=b&room_id=r1");
        assert_eq!(params.get("booking_id"), None);
        assert_eq!(classify(&params).booking_id.as_deref(), Some("r1"));
    }

    #[test]
    fn visibility_groups_follow_view() {
        let pro = classify(&EntryParams::from_pairs([
            ("pro_id", "pro-7"),
            ("booking_id", BOOKING),
        ]));
        assert!(pro.is_group_visible(VisibilityGroup::ProViewOnly));
        assert!(!pro.is_group_visible(VisibilityGroup::ClientViewOnly));
        assert_eq!(VisibilityGroup::ClientViewOnly.class_name(), "client-view-only");
    }
}
