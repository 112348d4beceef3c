//! Read models for the fundraiser pages, and the fetch boundary behind them.
//!
//! Every page loads its requests first and then all of their donations in one
//! batched query. If that batch cannot be fetched, donations are loaded per
//! request with bounded parallelism; a request whose fetch fails or times out is
//! shown with a total of 0 instead of failing the page. Each fetch runs under the
//! configured retry policy and time limit.

use crate::{
    core::{
        aggregate::{self, Classification, DonatedAmount, DonationSummary},
        repository::{DonationRepository, DonationRequestRepository},
        retry::{RetryPolicy, retry},
        user::Session,
    },
    entities::{Role, VerificationStatus, donation, donation_request},
    errors::{Error, Result},
};
use futures::{StreamExt, stream};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Limits applied to boundary fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    /// Per-request fetches allowed in flight at once
    pub concurrency: usize,
    /// Time limit for one fetch, retries included
    pub timeout: Duration,
    /// How failed fetches are retried
    pub retry: RetryPolicy,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

/// A request together with its funding progress.
#[derive(Debug, Clone, PartialEq)]
pub struct FundraiserCard {
    /// The request as stored
    pub request: donation_request::Model,
    /// Its derived progress
    pub summary: DonationSummary,
}

/// A receiver's own requests grouped the way the dashboard shows them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiverDashboard {
    /// Waiting for review
    pub pending: Vec<FundraiserCard>,
    /// Verified and still collecting
    pub open_verified: Vec<FundraiserCard>,
    /// Verified and fully funded
    pub fully_funded: Vec<FundraiserCard>,
    /// Refused by an admin
    pub rejected: Vec<FundraiserCard>,
    /// Money received across all requests
    pub total_raised: f64,
}

/// One line of a donor's history.
#[derive(Debug, Clone, PartialEq)]
pub struct DonationEntry {
    /// The donation as stored
    pub donation: donation::Model,
    /// Title of the funded request, if it could be loaded
    pub request_title: Option<String>,
}

/// Everything a donor has given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DonorHistory {
    /// Donations, newest first
    pub entries: Vec<DonationEntry>,
    /// Sum of all donations
    pub total_given: f64,
}

/// Runs one boundary fetch under the retry policy and the time limit.
async fn fetch<T, F, Fut>(settings: &FetchSettings, operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let millis = u64::try_from(settings.timeout.as_millis()).unwrap_or(u64::MAX);
    tokio::time::timeout(settings.timeout, retry(&settings.retry, operation))
        .await
        .map_err(|_| Error::Timeout { millis })?
}

/// Summaries for `requests`, loaded with one batched donation query.
///
/// Falls back to per-request fetches when the batch fails. Never fails itself.
pub async fn load_summaries<D>(
    donations: &D,
    requests: &[donation_request::Model],
    settings: &FetchSettings,
) -> HashMap<i64, DonationSummary>
where
    D: DonationRepository + ?Sized,
{
    let ids: Vec<i64> = requests.iter().map(|r| r.id).collect();

    match fetch(settings, || donations.donations_for_requests(&ids)).await {
        Ok(batch) => aggregate::summarize_all(requests, &batch),
        Err(err) => {
            warn!(
                requests = ids.len(),
                "Batched donation fetch failed: {err}. Falling back to per-request fetches"
            );
            load_summaries_per_request(donations, requests, settings).await
        }
    }
}

/// Summaries for `requests`, one donation fetch per request.
///
/// At most `settings.concurrency` fetches run at once. A failed fetch only
/// affects its own request, which is summarized as having received nothing.
pub async fn load_summaries_per_request<D>(
    donations: &D,
    requests: &[donation_request::Model],
    settings: &FetchSettings,
) -> HashMap<i64, DonationSummary>
where
    D: DonationRepository + ?Sized,
{
    stream::iter(requests)
        .map(|request| async move {
            match fetch(settings, || donations.donations_for_request(request.id)).await {
                Ok(list) => aggregate::summarize(request, &list),
                Err(err) => {
                    warn!(request_id = request.id, "Donation fetch failed, counting as 0: {err}");
                    DonationSummary::empty(request.id, request.requested_amount)
                }
            }
        })
        .buffered(settings.concurrency.max(1))
        .map(|summary| (summary.request_id, summary))
        .collect()
        .await
}

fn card_for(
    request: &donation_request::Model,
    summaries: &HashMap<i64, DonationSummary>,
) -> FundraiserCard {
    let summary = summaries
        .get(&request.id)
        .copied()
        .unwrap_or_else(|| DonationSummary::empty(request.id, request.requested_amount));
    FundraiserCard {
        request: request.clone(),
        summary,
    }
}

fn cards_for(
    requests: &[&donation_request::Model],
    summaries: &HashMap<i64, DonationSummary>,
) -> Vec<FundraiserCard> {
    requests.iter().map(|r| card_for(r, summaries)).collect()
}

async fn verified_with_summaries<R, D>(
    requests: &R,
    donations: &D,
    settings: &FetchSettings,
) -> Result<(Vec<donation_request::Model>, HashMap<i64, DonationSummary>)>
where
    R: DonationRequestRepository + ?Sized,
    D: DonationRepository + ?Sized,
{
    let verified = fetch(settings, || {
        requests.requests_by_status(VerificationStatus::Verified)
    })
    .await?;
    let summaries = load_summaries(donations, &verified, settings).await;
    Ok((verified, summaries))
}

/// Every verified request with its progress, for the public fundraiser carousel.
#[instrument(skip_all)]
pub async fn fundraiser_board<R, D>(
    requests: &R,
    donations: &D,
    settings: &FetchSettings,
) -> Result<Vec<FundraiserCard>>
where
    R: DonationRequestRepository + ?Sized,
    D: DonationRepository + ?Sized,
{
    let (verified, summaries) = verified_with_summaries(requests, donations, settings).await?;
    debug!(requests = verified.len(), "Loaded fundraiser board");
    Ok(verified.iter().map(|r| card_for(r, &summaries)).collect())
}

/// The requests a donor can still give to, in board order.
#[instrument(skip_all)]
pub async fn donor_feed<R, D>(
    requests: &R,
    donations: &D,
    settings: &FetchSettings,
) -> Result<Vec<FundraiserCard>>
where
    R: DonationRequestRepository + ?Sized,
    D: DonationRepository + ?Sized,
{
    let (verified, summaries) = verified_with_summaries(requests, donations, settings).await?;
    let fundable = aggregate::filter_fundable(&verified, &summaries);
    Ok(cards_for(&fundable, &summaries))
}

/// The session user's own requests, grouped by status and progress.
#[instrument(skip_all, fields(user_id = session.user_id))]
pub async fn receiver_dashboard<R, D>(
    session: &Session,
    requests: &R,
    donations: &D,
    settings: &FetchSettings,
) -> Result<ReceiverDashboard>
where
    R: DonationRequestRepository + ?Sized,
    D: DonationRepository + ?Sized,
{
    session.require_role(&[Role::Receiver, Role::Admin])?;

    let owned = fetch(settings, || requests.requests_by_owner(session.user_id)).await?;
    let summaries = load_summaries(donations, &owned, settings).await;

    let Classification {
        pending,
        open_verified,
        fully_funded,
        rejected,
    } = aggregate::classify(&owned, &summaries);

    Ok(ReceiverDashboard {
        pending: cards_for(&pending, &summaries),
        open_verified: cards_for(&open_verified, &summaries),
        fully_funded: cards_for(&fully_funded, &summaries),
        rejected: cards_for(&rejected, &summaries),
        total_raised: summaries.values().map(|s| s.total).sum(),
    })
}

/// Pending requests awaiting review, oldest first. Admins only.
#[instrument(skip_all, fields(user_id = session.user_id))]
pub async fn admin_queue<R>(
    session: &Session,
    requests: &R,
    settings: &FetchSettings,
) -> Result<Vec<donation_request::Model>>
where
    R: DonationRequestRepository + ?Sized,
{
    session.require_admin()?;
    fetch(settings, || requests.requests_by_status(VerificationStatus::Pending)).await
}

/// Everything the session user has donated, with the titles of the funded requests.
///
/// A title that cannot be loaded is left empty; it never fails the history.
#[instrument(skip_all, fields(user_id = session.user_id))]
pub async fn donor_history<R, D>(
    session: &Session,
    requests: &R,
    donations: &D,
    settings: &FetchSettings,
) -> Result<DonorHistory>
where
    R: DonationRequestRepository + ?Sized,
    D: DonationRepository + ?Sized,
{
    let given = fetch(settings, || donations.donations_by_donor(session.user_id)).await?;

    let mut seen = HashSet::new();
    let request_ids: Vec<i64> = given
        .iter()
        .map(|d| d.request_id)
        .filter(|id| seen.insert(*id))
        .collect();

    let titles: HashMap<i64, String> = stream::iter(request_ids)
        .map(|request_id| async move {
            match fetch(settings, || requests.request_by_id(request_id)).await {
                Ok(found) => found.map(|r| (request_id, r.title)),
                Err(err) => {
                    warn!(request_id, "Could not load request title: {err}");
                    None
                }
            }
        })
        .buffered(settings.concurrency.max(1))
        .filter_map(|entry| async move { entry })
        .collect()
        .await;

    let total_given = given.iter().map(DonatedAmount::donated_amount).sum();
    let entries = given
        .into_iter()
        .map(|donation| DonationEntry {
            request_title: titles.get(&donation.request_id).cloned(),
            donation,
        })
        .collect();

    Ok(DonorHistory {
        entries,
        total_given,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::repository::SeaOrmStore;
    use crate::test_utils::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    fn fast_settings() -> FetchSettings {
        FetchSettings {
            concurrency: 2,
            timeout: Duration::from_secs(5),
            retry: RetryPolicy {
                max_attempts: 2,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                multiplier: 2.0,
                jitter: 0.0,
            },
        }
    }

    /// Fails every batched fetch and the per-request fetch of one request.
    struct FlakyDonations {
        inner: SeaOrmStore,
        broken_request: i64,
        batch_calls: AtomicU32,
        delay: Option<Duration>,
    }

    impl FlakyDonations {
        fn new(inner: SeaOrmStore, broken_request: i64) -> Self {
            Self {
                inner,
                broken_request,
                batch_calls: AtomicU32::new(0),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl DonationRepository for FlakyDonations {
        async fn donations_for_request(&self, request_id: i64) -> Result<Vec<donation::Model>> {
            if request_id == self.broken_request {
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                return Err(Error::Validation {
                    message: "broken".to_string(),
                });
            }
            self.inner.donations_for_request(request_id).await
        }

        async fn donations_for_requests(&self, _request_ids: &[i64]) -> Result<Vec<donation::Model>> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Timeout { millis: 1 })
        }

        async fn donations_by_donor(&self, donor_id: i64) -> Result<Vec<donation::Model>> {
            self.inner.donations_by_donor(donor_id).await
        }

        async fn insert_donation(
            &self,
            session: &Session,
            request_id: i64,
            amount: f64,
        ) -> Result<donation::Model> {
            self.inner.insert_donation(session, request_id, amount).await
        }
    }

    /// Records how many per-request fetches overlap.
    #[derive(Default)]
    struct CountingDonations {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl DonationRepository for CountingDonations {
        async fn donations_for_request(&self, request_id: i64) -> Result<Vec<donation::Model>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            Ok(vec![donation::Model {
                id: request_id,
                request_id,
                donor_id: 1,
                amount: 5.0,
                created_at: chrono::Utc::now(),
            }])
        }

        async fn donations_for_requests(&self, _request_ids: &[i64]) -> Result<Vec<donation::Model>> {
            Ok(Vec::new())
        }

        async fn donations_by_donor(&self, _donor_id: i64) -> Result<Vec<donation::Model>> {
            Ok(Vec::new())
        }

        async fn insert_donation(
            &self,
            _session: &Session,
            request_id: i64,
            _amount: f64,
        ) -> Result<donation::Model> {
            Err(Error::RequestNotOpen {
                id: request_id,
                status: "read-only".to_string(),
            })
        }
    }

    fn verified_request(id: i64) -> donation_request::Model {
        donation_request::Model {
            id,
            user_id: 1,
            title: format!("Request {id}"),
            description: String::new(),
            category: String::new(),
            requested_amount: 20.0,
            cover_media: String::new(),
            location: String::new(),
            postal_code: String::new(),
            status: VerificationStatus::Verified,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_per_request_fetches_respect_concurrency_limit() {
        let counting = CountingDonations::default();
        let requests: Vec<_> = (1..=10).map(verified_request).collect();
        let settings = FetchSettings {
            concurrency: 3,
            ..fast_settings()
        };

        let summaries = load_summaries_per_request(&counting, &requests, &settings).await;

        assert_eq!(summaries.len(), 10);
        assert!(summaries.values().all(|s| s.total == 5.0 && s.percent_funded == 25));
        let peak = counting.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "{peak} fetches ran at once");
        assert!(peak >= 2, "fetches never overlapped");
        assert_eq!(counting.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fundraiser_board_shows_verified_with_progress() -> Result<()> {
        let (db, receiver) = setup_with_receiver().await?;
        let donor = create_test_session(&db, "Dee", Role::Donor).await?;

        let books = create_verified_request(&db, &receiver, "Books", 100.0).await?;
        create_test_request(&db, &receiver, "Pending", 200.0).await?;
        let food = create_verified_request(&db, &receiver, "Food", 50.0).await?;

        create_test_donation(&db, &donor, books.id, 40.0).await?;
        create_test_donation(&db, &donor, books.id, 35.0).await?;
        create_test_donation(&db, &donor, food.id, 60.0).await?;

        let store = SeaOrmStore::new(db);
        let board = fundraiser_board(&store, &store, &fast_settings()).await?;

        assert_eq!(board.len(), 2);
        assert_eq!(board[0].request.id, books.id);
        assert_eq!(board[0].summary.total, 75.0);
        assert_eq!(board[0].summary.percent_funded, 75);
        assert_eq!(board[0].summary.remaining, 25.0);
        assert_eq!(board[1].summary.percent_funded, 100);
        assert!(board[1].summary.is_fully_funded());

        Ok(())
    }

    #[tokio::test]
    async fn test_donor_feed_hides_fully_funded() -> Result<()> {
        let (db, receiver) = setup_with_receiver().await?;
        let donor = create_test_session(&db, "Dee", Role::Donor).await?;

        let open = create_verified_request(&db, &receiver, "Open", 100.0).await?;
        let funded = create_verified_request(&db, &receiver, "Funded", 50.0).await?;
        let later = create_verified_request(&db, &receiver, "Later", 10.0).await?;
        create_test_request(&db, &receiver, "Pending", 10.0).await?;
        create_test_donation(&db, &donor, funded.id, 50.0).await?;

        let store = SeaOrmStore::new(db);
        let feed = donor_feed(&store, &store, &fast_settings()).await?;

        let ids: Vec<i64> = feed.iter().map(|c| c.request.id).collect();
        assert_eq!(ids, vec![open.id, later.id]);

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_batch_falls_back_per_request() -> Result<()> {
        let (db, receiver) = setup_with_receiver().await?;
        let donor = create_test_session(&db, "Dee", Role::Donor).await?;

        let first = create_verified_request(&db, &receiver, "First", 100.0).await?;
        let broken = create_verified_request(&db, &receiver, "Broken", 100.0).await?;
        let third = create_verified_request(&db, &receiver, "Third", 100.0).await?;
        create_test_donation(&db, &donor, first.id, 10.0).await?;
        create_test_donation(&db, &donor, broken.id, 20.0).await?;
        create_test_donation(&db, &donor, third.id, 30.0).await?;

        let store = SeaOrmStore::new(db);
        let flaky = FlakyDonations::new(store.clone(), broken.id);
        let board = fundraiser_board(&store, &flaky, &fast_settings()).await?;

        // transient batch error is retried up to max_attempts
        assert_eq!(flaky.batch_calls.load(Ordering::SeqCst), 2);

        let totals: Vec<(i64, f64)> = board
            .iter()
            .map(|c| (c.request.id, c.summary.total))
            .collect();
        assert_eq!(totals, vec![(first.id, 10.0), (broken.id, 0.0), (third.id, 30.0)]);

        Ok(())
    }

    #[tokio::test]
    async fn test_slow_fetch_times_out_to_zero() -> Result<()> {
        let (db, receiver) = setup_with_receiver().await?;
        let donor = create_test_session(&db, "Dee", Role::Donor).await?;
        let slow = create_verified_request(&db, &receiver, "Slow", 100.0).await?;
        let fast = create_verified_request(&db, &receiver, "Fast", 100.0).await?;
        create_test_donation(&db, &donor, fast.id, 45.0).await?;

        let store = SeaOrmStore::new(db);
        let mut flaky = FlakyDonations::new(store.clone(), slow.id);
        flaky.delay = Some(Duration::from_millis(500));

        let settings = FetchSettings {
            timeout: Duration::from_millis(50),
            ..fast_settings()
        };
        let requests = vec![slow.clone(), fast.clone()];
        let summaries = load_summaries_per_request(&flaky, &requests, &settings).await;

        assert_eq!(summaries[&slow.id], DonationSummary::empty(slow.id, 100.0));
        assert_eq!(summaries[&fast.id].total, 45.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_receiver_dashboard_classifies_own_requests() -> Result<()> {
        let (db, receiver) = setup_with_receiver().await?;
        let other = create_test_session(&db, "Rae", Role::Receiver).await?;
        let donor = create_test_session(&db, "Dee", Role::Donor).await?;
        let admin = create_test_session(&db, "Root", Role::Admin).await?;

        let open = create_verified_request(&db, &receiver, "Open", 100.0).await?;
        let funded = create_verified_request(&db, &receiver, "Funded", 50.0).await?;
        let pending = create_test_request(&db, &receiver, "Pending", 10.0).await?;
        let rejected = create_test_request(&db, &receiver, "Rejected", 10.0).await?;
        crate::core::request::review_request(&db, &admin, rejected.id, VerificationStatus::Rejected)
            .await?;
        create_verified_request(&db, &other, "Not mine", 10.0).await?;

        create_test_donation(&db, &donor, open.id, 40.0).await?;
        create_test_donation(&db, &donor, funded.id, 60.0).await?;

        let store = SeaOrmStore::new(db);
        let dashboard = receiver_dashboard(&receiver, &store, &store, &fast_settings()).await?;

        assert_eq!(dashboard.open_verified.len(), 1);
        assert_eq!(dashboard.open_verified[0].request.id, open.id);
        assert_eq!(dashboard.fully_funded[0].request.id, funded.id);
        assert_eq!(dashboard.pending[0].request.id, pending.id);
        assert_eq!(dashboard.rejected[0].request.id, rejected.id);
        assert_eq!(dashboard.total_raised, 100.0);

        let denied = receiver_dashboard(&donor, &store, &store, &fast_settings()).await;
        assert!(matches!(denied, Err(Error::PermissionDenied { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_admin_queue_lists_pending_for_admins_only() -> Result<()> {
        let (db, receiver) = setup_with_receiver().await?;
        let admin = create_test_session(&db, "Root", Role::Admin).await?;
        let pending = create_test_request(&db, &receiver, "Pending", 10.0).await?;
        create_verified_request(&db, &receiver, "Verified", 10.0).await?;

        let store = SeaOrmStore::new(db);
        let queue = admin_queue(&admin, &store, &fast_settings()).await?;
        assert_eq!(queue, vec![pending]);

        let denied = admin_queue(&receiver, &store, &fast_settings()).await;
        assert!(matches!(denied, Err(Error::PermissionDenied { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_donor_history_totals_and_titles() -> Result<()> {
        let (db, receiver) = setup_with_receiver().await?;
        let donor = create_test_session(&db, "Dee", Role::Donor).await?;
        let books = create_verified_request(&db, &receiver, "Books", 100.0).await?;
        let food = create_verified_request(&db, &receiver, "Food", 100.0).await?;

        create_test_donation(&db, &donor, books.id, 15.0).await?;
        create_test_donation(&db, &donor, food.id, 25.0).await?;
        create_test_donation(&db, &donor, books.id, 5.0).await?;

        let store = SeaOrmStore::new(db);
        let history = donor_history(&donor, &store, &store, &fast_settings()).await?;

        assert_eq!(history.total_given, 45.0);
        assert_eq!(history.entries.len(), 3);
        assert_eq!(history.entries[0].request_title.as_deref(), Some("Books"));
        assert_eq!(history.entries[1].request_title.as_deref(), Some("Food"));

        Ok(())
    }
}
