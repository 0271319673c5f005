//! Concurrency properties of the router: per-user rate limits hold under
//! parallel load and turns for one user never interleave.

use std::sync::Arc;

use fuelbot::adapters::{
    InMemoryPriceRepository, InMemoryRateLimiter, InMemorySessionStorage, ManualClock,
    MockIntentClassifier,
};
use fuelbot::bootstrap::{Backends, Services};
use fuelbot::config::AppConfig;
use fuelbot::domain::foundation::UserKey;
use fuelbot::domain::messaging::{InboundMessage, TurnOutcome};
use fuelbot::domain::session::HISTORY_LIMIT;
use fuelbot::ports::Clock;

fn services(requests_per_window: u32) -> Services {
    let mut config = AppConfig::default();
    config.resilience.requests_per_window = requests_per_window;

    let clock: Arc<dyn Clock> = Arc::new(ManualClock::at_epoch_secs(1_700_000_000));
    let backends = Backends {
        session_storage: Arc::new(InMemorySessionStorage::with_clock(clock.clone())),
        rate_limiter: Arc::new(InMemoryRateLimiter::with_clock(
            config.resilience.rate_limit_config(),
            clock.clone(),
        )),
        classifier: Arc::new(MockIntentClassifier::new()),
        prices: Arc::new(InMemoryPriceRepository::with_sample_data(clock.now())),
        local_sessions: None,
        local_limiter: None,
    };
    Services::assemble(&config, &backends, clock).unwrap()
}

async fn burst(services: &Services, user: &UserKey, count: usize) -> Vec<TurnOutcome> {
    let tasks: Vec<_> = (0..count)
        .map(|i| {
            let router = services.router.clone();
            let user = user.clone();
            let text = if i % 2 == 0 { "/start" } else { "/help" };
            tokio::spawn(async move {
                router
                    .route(InboundMessage::text(user, text))
                    .await
                    .outcome
            })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(count);
    for task in tasks {
        outcomes.push(task.await.unwrap());
    }
    outcomes
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn hundred_parallel_messages_admit_exactly_the_limit() {
    let services = services(10);
    let user = UserKey::new("tg:burst").unwrap();

    let outcomes = burst(&services, &user, 100).await;

    let limited = outcomes
        .iter()
        .filter(|o| **o == TurnOutcome::RateLimited)
        .count();
    assert_eq!(limited, 90);
    assert_eq!(services.guard.active_count(), 0);

    let session = services.sessions.load(&user).await;
    assert_eq!(session.history_len(), HISTORY_LIMIT);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn users_have_separate_budgets() {
    let services = services(3);
    let alice = UserKey::new("tg:alice").unwrap();
    let bob = UserKey::new("tg:bob").unwrap();

    let (a, b) = tokio::join!(burst(&services, &alice, 5), burst(&services, &bob, 5));

    for outcomes in [a, b] {
        let admitted = outcomes
            .iter()
            .filter(|o| **o != TurnOutcome::RateLimited)
            .count();
        assert_eq!(admitted, 3);
    }
}
