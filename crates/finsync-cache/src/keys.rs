//! User-scoped cache keys.
//!
//! A [`CacheKey`] can only be built through the namespace constructors below,
//! each of which requires the owning user id. Keys are
//! `namespace:user[:segment...]` with the user and id segments escaped, so a
//! user id containing `:` can never produce a key inside another user's scope.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use finsync_types::{RecordQuery, ReportWindow};
use sha2::{Digest, Sha256};

/// Key namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Transactions,
    Transaction,
    TransactionCategories,
    Dashboard,
    DashboardCharts,
    UserProfile,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Transactions => "transactions",
            Namespace::Transaction => "transaction",
            Namespace::TransactionCategories => "transaction_categories",
            Namespace::Dashboard => "dashboard",
            Namespace::DashboardCharts => "dashboard_charts",
            Namespace::UserProfile => "user_profile",
        }
    }

    /// Namespaces whose contents derive from a user's records.
    pub const RECORD_DERIVED: [Namespace; 5] = [
        Namespace::Transactions,
        Namespace::Transaction,
        Namespace::TransactionCategories,
        Namespace::Dashboard,
        Namespace::DashboardCharts,
    ];
}

/// Deterministic cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// `transactions:{user}:{filterHash}`; the hash is `all` for the
    /// unfiltered, unpaginated query.
    pub fn transactions(user_id: &str, query: &RecordQuery) -> Self {
        let hash = query
            .canonical()
            .map(|canonical| filter_hash(&canonical))
            .unwrap_or_else(|| "all".to_string());
        Self::build(Namespace::Transactions, user_id, &[hash.as_str()])
    }

    /// `transaction:{user}:{id}`
    pub fn transaction(user_id: &str, id: &str) -> Self {
        Self::build(Namespace::Transaction, user_id, &[escape(id).as_str()])
    }

    /// `transaction_categories:{user}`
    pub fn transaction_categories(user_id: &str) -> Self {
        Self::build(Namespace::TransactionCategories, user_id, &[])
    }

    /// `dashboard:{user}:{period}:{windowKey}`
    pub fn dashboard(user_id: &str, window: &ReportWindow) -> Self {
        Self::build(
            Namespace::Dashboard,
            user_id,
            &[window.period().as_str(), window.key().as_str()],
        )
    }

    /// `dashboard_charts:{user}:{period}:{windowKey}`
    pub fn dashboard_charts(user_id: &str, window: &ReportWindow) -> Self {
        Self::build(
            Namespace::DashboardCharts,
            user_id,
            &[window.period().as_str(), window.key().as_str()],
        )
    }

    /// `user_profile:{user}`
    pub fn user_profile(user_id: &str) -> Self {
        Self::build(Namespace::UserProfile, user_id, &[])
    }

    /// Scope covering every key of `namespace` owned by `user_id`.
    ///
    /// A scope matches a key when the key equals it or continues it with a
    /// `:` segment boundary; see [`CacheKey::in_scope`].
    pub fn scope(namespace: Namespace, user_id: &str) -> String {
        format!("{}:{}", namespace.as_str(), escape(user_id))
    }

    /// Scopes of every record-derived namespace for a user.
    pub fn user_record_prefixes(user_id: &str) -> Vec<String> {
        Namespace::RECORD_DERIVED
            .iter()
            .map(|ns| Self::scope(*ns, user_id))
            .collect()
    }

    /// Whether `key` lies inside `scope`.
    pub fn in_scope(key: &str, scope: &str) -> bool {
        match key.strip_prefix(scope) {
            Some(rest) => rest.is_empty() || rest.starts_with(':'),
            None => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn build(namespace: Namespace, user_id: &str, segments: &[&str]) -> Self {
        let mut key = Self::scope(namespace, user_id);
        for segment in segments {
            key.push(':');
            key.push_str(segment);
        }
        Self(key)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Escape the segment separator (and the escape character itself).
fn escape(segment: &str) -> String {
    segment.replace('%', "%25").replace(':', "%3A")
}

/// SHA-256 of the canonical query, URL-safe base64 without padding.
fn filter_hash(canonical: &str) -> String {
    let digest = Sha256::digest(canonical.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsync_types::{Filter, RecordKind};
    use proptest::prelude::*;

    #[test]
    fn test_templates() {
        let march = ReportWindow::Month { year: 2025, month: 3 };
        assert_eq!(
            CacheKey::transactions("u1", &RecordQuery::default()).as_str(),
            "transactions:u1:all"
        );
        assert_eq!(CacheKey::transaction("u1", "r9").as_str(), "transaction:u1:r9");
        assert_eq!(
            CacheKey::transaction_categories("u1").as_str(),
            "transaction_categories:u1"
        );
        assert_eq!(
            CacheKey::dashboard("u1", &march).as_str(),
            "dashboard:u1:month:2025-03"
        );
        assert_eq!(
            CacheKey::dashboard_charts("u1", &ReportWindow::Week).as_str(),
            "dashboard_charts:u1:week:trailing"
        );
        assert_eq!(CacheKey::user_profile("u1").as_str(), "user_profile:u1");
    }

    #[test]
    fn test_user_ids_are_escaped() {
        let key = CacheKey::transaction_categories("u1:evil");
        assert_eq!(key.as_str(), "transaction_categories:u1%3Aevil");
        assert!(!CacheKey::in_scope(
            key.as_str(),
            &CacheKey::scope(Namespace::TransactionCategories, "u1")
        ));
    }

    #[test]
    fn test_scope_respects_segment_boundary() {
        let scope = CacheKey::scope(Namespace::TransactionCategories, "u1");
        assert!(CacheKey::in_scope("transaction_categories:u1", &scope));
        assert!(!CacheKey::in_scope("transaction_categories:u10", &scope));

        let scope = CacheKey::scope(Namespace::Transaction, "u1");
        assert!(CacheKey::in_scope("transaction:u1:r1", &scope));
        assert!(!CacheKey::in_scope("transactions:u1:all", &scope));
    }

    #[test]
    fn test_record_prefixes_exclude_profile() {
        let prefixes = CacheKey::user_record_prefixes("u1");
        assert_eq!(prefixes.len(), 5);
        assert!(
            !prefixes
                .iter()
                .any(|p| CacheKey::in_scope(CacheKey::user_profile("u1").as_str(), p))
        );
    }

    #[test]
    fn test_empty_filter_strings_share_key() {
        let a = RecordQuery::new(Filter::all().with_category(""));
        let b = RecordQuery::default();
        assert_eq!(CacheKey::transactions("u1", &a), CacheKey::transactions("u1", &b));
    }

    proptest! {
        #[test]
        fn prop_key_is_deterministic(category in "[A-Za-z]{0,8}", size in 1usize..100) {
            let build = || {
                RecordQuery::new(Filter::all().with_kind(RecordKind::Expense).with_category(category.clone()))
                    .with_page_size(size)
            };
            prop_assert_eq!(CacheKey::transactions("u", &build()), CacheKey::transactions("u", &build()));
        }

        #[test]
        fn prop_users_never_share_keys(a in "[a-z0-9:%]{1,6}", b in "[a-z0-9:%]{1,6}") {
            prop_assume!(a != b);
            let q = RecordQuery::default();
            prop_assert_ne!(CacheKey::transactions(&a, &q), CacheKey::transactions(&b, &q));
            for scope in CacheKey::user_record_prefixes(&a) {
                prop_assert!(!CacheKey::in_scope(CacheKey::transactions(&b, &q).as_str(), &scope));
            }
        }
    }
}
