//! Site classification.
//!
//! Decides whether a page belongs to the blocked (social), news, or adult
//! list. Matching is deliberately loose: a list entry matches when it
//! appears anywhere in the URL or hostname after scheme/`www.` stripping.
//! There is no public-suffix parsing; `facebook.com` in a list also matches
//! `myfacebook.com.evil.example`, and that is accepted behavior.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage::{get_json, keys, set_json, KvStore};

/// Site category. Determines the block duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Generic social/distraction site.
    Blocked,
    News,
    Adult,
}

impl Category {
    /// Block duration for this category. Adult sites get a 4x longer
    /// cooldown as a stronger deterrent.
    pub fn duration_ms(self) -> u64 {
        match self {
            Category::Blocked => 60 * 60 * 1000,
            Category::News => 60 * 60 * 1000,
            Category::Adult => 4 * 60 * 60 * 1000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Blocked => "blocked",
            Category::News => "news",
            Category::Adult => "adult",
        }
    }

    fn list_key(self) -> &'static str {
        match self {
            Category::Blocked => keys::BLOCKED_SITES,
            Category::News => keys::NEWS_SITES,
            Category::Adult => keys::ADULT_SITES,
        }
    }
}

impl std::str::FromStr for Category {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blocked" => Ok(Category::Blocked),
            "news" => Ok(Category::News),
            "adult" => Ok(Category::Adult),
            other => Err(crate::error::ValidationError::UnknownCategory(
                other.to_string(),
            )),
        }
    }
}

/// Result of classifying a page. Flags are independent; a page matching
/// more than one list carries all of its flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub is_blocked: bool,
    pub is_news: bool,
    pub is_adult: bool,
}

impl Classification {
    /// True when any list matched.
    pub fn is_tracked(&self) -> bool {
        self.is_blocked || self.is_news || self.is_adult
    }

    /// The category used when a block is created for this page. News wins
    /// over generic blocked so the site shares the collective news block;
    /// adult wins over everything for the longer cooldown.
    pub fn block_category(&self) -> Option<Category> {
        if self.is_adult {
            Some(Category::Adult)
        } else if self.is_news {
            Some(Category::News)
        } else if self.is_blocked {
            Some(Category::Blocked)
        } else {
            None
        }
    }
}

/// The three persisted site lists. Loaded fresh on every page-load
/// classification; written only by the settings surface (CLI).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteLists {
    pub blocked: Vec<String>,
    pub news: Vec<String>,
    pub adult: Vec<String>,
}

impl SiteLists {
    /// Load all three lists. A missing or unreadable list is an empty
    /// list, never an error.
    pub fn load(store: &dyn KvStore) -> Self {
        Self {
            blocked: load_list(store, keys::BLOCKED_SITES),
            news: load_list(store, keys::NEWS_SITES),
            adult: load_list(store, keys::ADULT_SITES),
        }
    }

    pub fn list(&self, category: Category) -> &[String] {
        match category {
            Category::Blocked => &self.blocked,
            Category::News => &self.news,
            Category::Adult => &self.adult,
        }
    }

    /// Append a site to a category list and persist it. Duplicates are
    /// harmless and not rejected.
    pub fn add(
        store: &dyn KvStore,
        category: Category,
        site: &str,
    ) -> Result<(), StorageError> {
        let mut list = load_list(store, category.list_key());
        list.push(site.trim().to_string());
        set_json(store, category.list_key(), &list)
    }

    /// Remove every occurrence of a site from a category list.
    pub fn remove(
        store: &dyn KvStore,
        category: Category,
        site: &str,
    ) -> Result<(), StorageError> {
        let mut list = load_list(store, category.list_key());
        list.retain(|s| s != site);
        set_json(store, category.list_key(), &list)
    }

    /// Classify a page by URL and hostname. Pure: same lists and inputs
    /// always produce the same flags.
    pub fn classify(&self, url: &str, hostname: &str) -> Classification {
        Classification {
            is_blocked: matches_any(&self.blocked, url, hostname),
            is_news: matches_any(&self.news, url, hostname),
            is_adult: matches_any(&self.adult, url, hostname),
        }
    }
}

fn load_list(store: &dyn KvStore, key: &str) -> Vec<String> {
    match get_json::<Vec<String>>(store, key) {
        Ok(Some(list)) => list,
        Ok(None) => Vec::new(),
        Err(e) => {
            log::warn!("site list '{key}' unreadable, treating as empty: {e}");
            Vec::new()
        }
    }
}

fn matches_any(list: &[String], url: &str, hostname: &str) -> bool {
    let url = url.to_ascii_lowercase();
    let hostname = hostname.to_ascii_lowercase();
    list.iter().any(|entry| {
        let needle = normalize(entry);
        !needle.is_empty() && (url.contains(&needle) || hostname.contains(&needle))
    })
}

/// Strip a leading scheme and `www.` from a list entry so entries saved as
/// full URLs still match bare hostnames.
fn normalize(entry: &str) -> String {
    let mut s = entry.trim().to_ascii_lowercase();
    for scheme in ["https://", "http://"] {
        if let Some(rest) = s.strip_prefix(scheme) {
            s = rest.to_string();
            break;
        }
    }
    if let Some(rest) = s.strip_prefix("www.") {
        s = rest.to_string();
    }
    s.trim_end_matches('/').to_string()
}
