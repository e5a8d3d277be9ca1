//! Seatlock demo
//!
//! Walks through each reservation strategy once against real backends.
//!
//! This binary:
//! - Connects to `PostgreSQL` (seat store) and Redis (lock coordinator)
//! - Runs migrations and seeds one group with three seats
//! - Claims one seat per strategy
//! - Repeats each claim to show `AlreadyClaimed`
//!
//! # Usage
//!
//! ```bash
//! # Start infrastructure
//! docker run -d -p 5432:5432 -e POSTGRES_PASSWORD=postgres -e POSTGRES_DB=seatlock postgres:16
//! docker run -d -p 6379:6379 redis:7
//!
//! # Run demo
//! cargo run --bin demo
//! ```

use seatlock_core::{ClaimantId, NewGroup, NewSeat, SeatStore, Utc};
use seatlock_reservation::metrics::{install_prometheus_exporter, register_reservation_metrics};
use seatlock_reservation::{Config, ReservationService, StrategyKind};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,seatlock=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(
        redis = %config.redis.url,
        processing_delay_ms = config.reservation.processing_delay_ms,
        lock_ttl_secs = config.reservation.lock_ttl_secs,
        "Configuration loaded"
    );

    if config.metrics.enabled {
        install_prometheus_exporter(config.metrics.port)?;
    } else {
        register_reservation_metrics();
    }

    let service = ReservationService::connect(&config).await?;
    service.store().migrate().await?;
    tracing::info!("✓ Migrations applied");

    let store = service.store();
    let group = store
        .create_group(NewGroup {
            name: "Demo Concert".to_string(),
            date: Utc::now().date_naive(),
            total_seats: 3,
        })
        .await?;

    let mut seats = Vec::with_capacity(StrategyKind::ALL.len());
    for seat_number in 1..=3 {
        seats.push(
            store
                .create_seat(NewSeat {
                    group_id: group.id,
                    seat_number,
                })
                .await?,
        );
    }
    tracing::info!(group_id = %group.id, seats = seats.len(), "✓ Seeded group");

    for (kind, seat) in StrategyKind::ALL.into_iter().zip(&seats) {
        let first = ClaimantId::new(format!("{kind}-first"));
        let second = ClaimantId::new(format!("{kind}-second"));

        match service.reserve(kind, group.id, seat.id, &first).await {
            Ok(claim_id) => tracing::info!(strategy = %kind, seat_id = %seat.id, claim_id = %claim_id, "✓ Claimed"),
            Err(error) => tracing::error!(strategy = %kind, seat_id = %seat.id, %error, "✗ Claim failed"),
        }

        match service.reserve(kind, group.id, seat.id, &second).await {
            Ok(claim_id) => {
                tracing::error!(strategy = %kind, claim_id = %claim_id, "✗ Seat claimed twice");
            }
            Err(error) => {
                tracing::info!(strategy = %kind, seat_id = %seat.id, %error, "✓ Repeat attempt rejected");
            }
        }

        let claims = store.count_claims_for_seat(seat.id).await?;
        tracing::info!(strategy = %kind, seat_id = %seat.id, claims, "Claims on seat");
    }

    Ok(())
}
