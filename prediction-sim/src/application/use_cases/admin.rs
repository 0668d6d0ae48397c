use super::ErrorKind;
use crate::application::ports::{EventPublisher, LedgerRepository, StoreError};
use crate::domain::{BalanceUpdateEvent, Clock, Market, MarketEvent, User, UserId};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Operator actions: seeding markets and users, adjusting balances
pub struct AdminUseCase<C, L, E>
where
    C: Clock,
    L: LedgerRepository,
    E: EventPublisher,
{
    clock: Arc<C>,
    ledger: Arc<L>,
    event_publisher: Arc<E>,
}

impl<C, L, E> AdminUseCase<C, L, E>
where
    C: Clock,
    L: LedgerRepository,
    E: EventPublisher,
{
    pub fn new(clock: Arc<C>, ledger: Arc<L>, event_publisher: Arc<E>) -> Self {
        Self {
            clock,
            ledger,
            event_publisher,
        }
    }

    pub async fn create_market(
        &self,
        title: &str,
        description: &str,
    ) -> Result<Market, AdminError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AdminError::Validation("title must not be empty".into()));
        }

        let market = self
            .ledger
            .create_market(title.to_string(), description.to_string(), self.clock.now())
            .await?;
        info!(market_id = %market.id, title = %market.title, "Market created");
        Ok(market)
    }

    pub async fn create_user(&self, name: &str, balance: Decimal) -> Result<User, AdminError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AdminError::Validation("name must not be empty".into()));
        }
        if balance < Decimal::ZERO {
            return Err(AdminError::Validation("balance must not be negative".into()));
        }

        let user = self
            .ledger
            .create_user(name.to_string(), balance, false, self.clock.now())
            .await?;
        info!(user_id = %user.id, name = %user.name, "User created");
        Ok(user)
    }

    /// Overwrite a balance and notify the user's subscribers
    pub async fn set_balance(&self, user_id: UserId, balance: Decimal) -> Result<User, AdminError> {
        if balance < Decimal::ZERO {
            return Err(AdminError::Validation("balance must not be negative".into()));
        }

        let user = self
            .ledger
            .set_balance(user_id, balance)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => AdminError::UserNotFound(user_id),
                other => AdminError::Store(other),
            })?;

        self.event_publisher
            .publish_to_user(
                user.id,
                MarketEvent::BalanceUpdate(BalanceUpdateEvent {
                    user_id: user.id,
                    balance: user.balance,
                }),
            )
            .await;
        Ok(user)
    }
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{0}")]
    Validation(String),

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdminError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdminError::Validation(_) => ErrorKind::Validation,
            AdminError::UserNotFound(_) => ErrorKind::NotFound,
            AdminError::Store(_) => ErrorKind::StoreFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{BroadcastEventPublisher, InMemoryLedgerRepository, SimulationClock};
    use rust_decimal_macros::dec;

    fn admin() -> (
        AdminUseCase<SimulationClock, InMemoryLedgerRepository, BroadcastEventPublisher>,
        Arc<BroadcastEventPublisher>,
    ) {
        let publisher = Arc::new(BroadcastEventPublisher::new(16));
        let admin = AdminUseCase::new(
            Arc::new(SimulationClock::fixed()),
            Arc::new(InMemoryLedgerRepository::new()),
            Arc::clone(&publisher),
        );
        (admin, publisher)
    }

    #[tokio::test]
    async fn test_create_market_assigns_sequential_ids() {
        let (admin, _) = admin();
        let first = admin.create_market("  Rain?  ", "").await.unwrap();
        let second = admin.create_market("Snow?", "flakes").await.unwrap();

        assert_eq!(first.title, "Rain?");
        assert_eq!(second.id.get(), first.id.get() + 1);
        assert!(first.is_open());
        assert_eq!((first.yes_shares, first.no_shares), (0, 0));
    }

    #[tokio::test]
    async fn test_validation() {
        let (admin, _) = admin();
        assert_eq!(
            admin.create_market(" ", "").await.unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            admin.create_user("eve", dec!(-1)).await.unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            admin
                .set_balance(UserId::new(9), dec!(10))
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_set_balance_notifies_user() {
        let (admin, publisher) = admin();
        let user = admin.create_user("carol", dec!(100)).await.unwrap();
        let mut rx = publisher.subscribe_user(user.id);

        let updated = admin.set_balance(user.id, dec!(250.5)).await.unwrap();
        assert_eq!(updated.balance, dec!(250.5));
        assert!(matches!(
            rx.try_recv().unwrap(),
            MarketEvent::BalanceUpdate(e) if e.balance == dec!(250.5)
        ));
    }
}
