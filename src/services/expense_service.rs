use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::expense::{CreateExpenseRequest, Expense, ExpenseSource};
use crate::models::reports::{DashboardStats, DateRange};
use crate::repositories::category_repository::CategoryRepository;
use crate::repositories::expense_repository::{ExpenseRepository, RepositoryError};

/// How many rows the listing endpoint returns at most
const RECENT_LIMIT: i64 = 100;

/// Expense service errors
#[derive(Debug, thiserror::Error)]
pub enum ExpenseError {
    #[error("Invalid amount: amount must be positive")]
    InvalidAmount,

    #[error("Category not found")]
    CategoryNotFound,

    #[error("Expense not found")]
    EntryNotFound,

    #[error("Unauthorized to access this entry")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

fn map_repo_error(e: RepositoryError) -> ExpenseError {
    match e {
        RepositoryError::NotFound => ExpenseError::EntryNotFound,
        RepositoryError::ConstraintViolation(msg) => ExpenseError::DatabaseError(msg),
        RepositoryError::DatabaseError(msg) => ExpenseError::DatabaseError(msg),
    }
}

/// First day of the week containing `today`, Monday-anchored
pub fn week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(today.weekday().num_days_from_monday() as i64)
}

/// First day of the calendar month containing `today`
pub fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

/// Trait defining expense service operations
#[async_trait]
pub trait ExpenseService: Send + Sync {
    /// Record a new expense against one of the user's active categories
    async fn create_expense(
        &self,
        user_id: Uuid,
        request: CreateExpenseRequest,
        source: ExpenseSource,
    ) -> Result<Expense, ExpenseError>;

    /// Most recent live expenses, date-descending
    async fn list_recent(&self, user_id: Uuid) -> Result<Vec<Expense>, ExpenseError>;

    /// Soft-delete an expense the user owns
    async fn delete_expense(&self, user_id: Uuid, expense_id: Uuid) -> Result<(), ExpenseError>;

    /// Irreversibly remove an expense (administrative use)
    async fn purge_expense(&self, user_id: Uuid, expense_id: Uuid) -> Result<(), ExpenseError>;

    /// Headline dashboard figures for today / this week / this month
    async fn dashboard_stats(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> Result<DashboardStats, ExpenseError>;
}

/// Implementation of ExpenseService
pub struct ExpenseServiceImpl {
    expense_repository: Arc<dyn ExpenseRepository>,
    category_repository: Arc<dyn CategoryRepository>,
}

impl ExpenseServiceImpl {
    pub fn new(
        expense_repository: Arc<dyn ExpenseRepository>,
        category_repository: Arc<dyn CategoryRepository>,
    ) -> Self {
        Self {
            expense_repository,
            category_repository,
        }
    }

    async fn owned_expense(
        &self,
        user_id: Uuid,
        expense_id: Uuid,
    ) -> Result<Expense, ExpenseError> {
        let expense = self
            .expense_repository
            .find_by_id(expense_id)
            .await
            .map_err(map_repo_error)?
            .ok_or(ExpenseError::EntryNotFound)?;

        if expense.user_id != user_id {
            return Err(ExpenseError::Unauthorized);
        }
        Ok(expense)
    }
}

#[async_trait]
impl ExpenseService for ExpenseServiceImpl {
    async fn create_expense(
        &self,
        user_id: Uuid,
        request: CreateExpenseRequest,
        source: ExpenseSource,
    ) -> Result<Expense, ExpenseError> {
        if request.amount <= rust_decimal::Decimal::ZERO {
            return Err(ExpenseError::InvalidAmount);
        }

        // The category must exist, be active, and belong to the same user as
        // the expense.
        let category = self
            .category_repository
            .find_by_id(request.category_id)
            .await
            .map_err(|e| ExpenseError::DatabaseError(e.to_string()))?
            .ok_or(ExpenseError::CategoryNotFound)?;

        if category.user_id != user_id || !category.is_active {
            return Err(ExpenseError::CategoryNotFound);
        }

        let now = chrono::Utc::now();
        let expense = Expense {
            id: Uuid::new_v4(),
            user_id,
            category_id: category.id,
            amount: request.amount,
            description: request.description.unwrap_or_default(),
            date: request.date.unwrap_or_else(|| now.date_naive()),
            source,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        self.expense_repository
            .create(expense)
            .await
            .map_err(map_repo_error)
    }

    async fn list_recent(&self, user_id: Uuid) -> Result<Vec<Expense>, ExpenseError> {
        self.expense_repository
            .find_recent(user_id, RECENT_LIMIT)
            .await
            .map_err(map_repo_error)
    }

    async fn delete_expense(&self, user_id: Uuid, expense_id: Uuid) -> Result<(), ExpenseError> {
        self.owned_expense(user_id, expense_id).await?;

        self.expense_repository
            .soft_delete(user_id, expense_id)
            .await
            .map_err(map_repo_error)
    }

    async fn purge_expense(&self, user_id: Uuid, expense_id: Uuid) -> Result<(), ExpenseError> {
        self.owned_expense(user_id, expense_id).await?;

        self.expense_repository
            .purge(user_id, expense_id)
            .await
            .map_err(map_repo_error)
    }

    async fn dashboard_stats(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> Result<DashboardStats, ExpenseError> {
        let day = DateRange {
            start: today,
            end: today,
        };
        let week = DateRange {
            start: week_start(today),
            end: today,
        };
        let month = DateRange {
            start: month_start(today),
            end: today,
        };

        let today_total = self
            .expense_repository
            .sum_in_range(user_id, day)
            .await
            .map_err(map_repo_error)?;
        let week_total = self
            .expense_repository
            .sum_in_range(user_id, week)
            .await
            .map_err(map_repo_error)?;
        let month_total = self
            .expense_repository
            .sum_in_range(user_id, month)
            .await
            .map_err(map_repo_error)?;
        let by_category = self
            .expense_repository
            .sum_by_category(user_id, month)
            .await
            .map_err(map_repo_error)?;

        Ok(DashboardStats {
            today_total,
            week_total,
            month_total,
            by_category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::category::Category;
    use crate::models::reports::{CategoryTotal, ExpenseLine};
    use crate::repositories::category_repository::RepositoryError as CategoryRepositoryError;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::str::FromStr;
    use std::sync::Mutex;

    // Mock ExpenseRepository for testing
    struct MockExpenseRepository {
        expenses: Mutex<HashMap<Uuid, Expense>>,
    }

    impl MockExpenseRepository {
        fn new() -> Self {
            Self {
                expenses: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl ExpenseRepository for MockExpenseRepository {
        async fn create(&self, expense: Expense) -> Result<Expense, RepositoryError> {
            let mut expenses = self.expenses.lock().unwrap();
            expenses.insert(expense.id, expense.clone());
            Ok(expense)
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<Expense>, RepositoryError> {
            let expenses = self.expenses.lock().unwrap();
            Ok(expenses.get(&id).cloned())
        }

        async fn find_recent(
            &self,
            user_id: Uuid,
            limit: i64,
        ) -> Result<Vec<Expense>, RepositoryError> {
            let expenses = self.expenses.lock().unwrap();
            let mut rows: Vec<Expense> = expenses
                .values()
                .filter(|e| e.user_id == user_id && !e.is_deleted)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.date.cmp(&a.date));
            rows.truncate(limit as usize);
            Ok(rows)
        }

        async fn find_lines_in_range(
            &self,
            user_id: Uuid,
            range: DateRange,
        ) -> Result<Vec<ExpenseLine>, RepositoryError> {
            let expenses = self.expenses.lock().unwrap();
            Ok(expenses
                .values()
                .filter(|e| {
                    e.user_id == user_id
                        && !e.is_deleted
                        && e.date >= range.start
                        && e.date <= range.end
                })
                .map(|e| ExpenseLine {
                    category_name: "category".to_string(),
                    category_icon: "💰".to_string(),
                    amount: e.amount,
                    date: e.date,
                })
                .collect())
        }

        async fn find_lines_by_category(
            &self,
            _user_id: Uuid,
            _category_id: Uuid,
            _range: DateRange,
        ) -> Result<Vec<ExpenseLine>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn sum_by_category(
            &self,
            user_id: Uuid,
            range: DateRange,
        ) -> Result<Vec<CategoryTotal>, RepositoryError> {
            let lines = self.find_lines_in_range(user_id, range).await?;
            if lines.is_empty() {
                return Ok(Vec::new());
            }
            let total = lines.iter().map(|l| l.amount).sum();
            Ok(vec![CategoryTotal {
                category_name: "category".to_string(),
                category_icon: "💰".to_string(),
                total,
            }])
        }

        async fn sum_in_range(
            &self,
            user_id: Uuid,
            range: DateRange,
        ) -> Result<Decimal, RepositoryError> {
            let lines = self.find_lines_in_range(user_id, range).await?;
            Ok(lines.iter().map(|l| l.amount).sum())
        }

        async fn soft_delete(
            &self,
            user_id: Uuid,
            expense_id: Uuid,
        ) -> Result<(), RepositoryError> {
            let mut expenses = self.expenses.lock().unwrap();
            match expenses.get_mut(&expense_id) {
                Some(e) if e.user_id == user_id && !e.is_deleted => {
                    e.is_deleted = true;
                    e.deleted_at = Some(Utc::now());
                    Ok(())
                }
                _ => Err(RepositoryError::NotFound),
            }
        }

        async fn purge(&self, user_id: Uuid, expense_id: Uuid) -> Result<(), RepositoryError> {
            let mut expenses = self.expenses.lock().unwrap();
            match expenses.get(&expense_id) {
                Some(e) if e.user_id == user_id => {
                    expenses.remove(&expense_id);
                    Ok(())
                }
                _ => Err(RepositoryError::NotFound),
            }
        }
    }

    // Mock CategoryRepository holding a fixed set of categories
    struct MockCategoryRepository {
        categories: Mutex<HashMap<Uuid, Category>>,
    }

    impl MockCategoryRepository {
        fn new() -> Self {
            Self {
                categories: Mutex::new(HashMap::new()),
            }
        }

        fn add(&self, user_id: Uuid, name: &str, is_active: bool) -> Category {
            let category = Category {
                id: Uuid::new_v4(),
                user_id,
                name: name.to_string(),
                icon: "💰".to_string(),
                color: "#4CAF50".to_string(),
                is_default: false,
                is_active,
                created_at: Utc::now(),
            };
            self.categories
                .lock()
                .unwrap()
                .insert(category.id, category.clone());
            category
        }
    }

    #[async_trait]
    impl CategoryRepository for MockCategoryRepository {
        async fn create(&self, category: Category) -> Result<Category, CategoryRepositoryError> {
            self.categories
                .lock()
                .unwrap()
                .insert(category.id, category.clone());
            Ok(category)
        }

        async fn find_by_id(
            &self,
            id: Uuid,
        ) -> Result<Option<Category>, CategoryRepositoryError> {
            Ok(self.categories.lock().unwrap().get(&id).cloned())
        }

        async fn find_active_by_user(
            &self,
            user_id: Uuid,
        ) -> Result<Vec<Category>, CategoryRepositoryError> {
            Ok(self
                .categories
                .lock()
                .unwrap()
                .values()
                .filter(|c| c.user_id == user_id && c.is_active)
                .cloned()
                .collect())
        }

        async fn find_active_by_name(
            &self,
            user_id: Uuid,
            name: &str,
        ) -> Result<Option<Category>, CategoryRepositoryError> {
            Ok(self
                .categories
                .lock()
                .unwrap()
                .values()
                .find(|c| {
                    c.user_id == user_id && c.is_active && c.name.eq_ignore_ascii_case(name)
                })
                .cloned())
        }

        async fn deactivate(
            &self,
            _user_id: Uuid,
            _category_id: Uuid,
        ) -> Result<(), CategoryRepositoryError> {
            Ok(())
        }
    }

    fn service() -> (ExpenseServiceImpl, Arc<MockExpenseRepository>, Arc<MockCategoryRepository>) {
        let expenses = Arc::new(MockExpenseRepository::new());
        let categories = Arc::new(MockCategoryRepository::new());
        (
            ExpenseServiceImpl::new(expenses.clone(), categories.clone()),
            expenses,
            categories,
        )
    }

    fn request(category_id: Uuid, amount: &str) -> CreateExpenseRequest {
        CreateExpenseRequest {
            category_id,
            amount: Decimal::from_str(amount).unwrap(),
            description: Some("test".to_string()),
            date: Some(NaiveDate::from_ymd_opt(2026, 8, 4).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_create_expense_success() {
        let (service, _, categories) = service();
        let user_id = Uuid::new_v4();
        let category = categories.add(user_id, "Food", true);

        let expense = service
            .create_expense(user_id, request(category.id, "42.50"), ExpenseSource::Web)
            .await
            .unwrap();

        assert_eq!(expense.amount, Decimal::from_str("42.50").unwrap());
        assert_eq!(expense.category_id, category.id);
        assert_eq!(expense.source, ExpenseSource::Web);
        assert!(!expense.is_deleted);
    }

    #[tokio::test]
    async fn test_create_expense_rejects_non_positive_amount() {
        let (service, _, categories) = service();
        let user_id = Uuid::new_v4();
        let category = categories.add(user_id, "Food", true);

        for amount in ["0", "-10.00"] {
            let result = service
                .create_expense(user_id, request(category.id, amount), ExpenseSource::Web)
                .await;
            assert!(matches!(result, Err(ExpenseError::InvalidAmount)));
        }
    }

    #[tokio::test]
    async fn test_create_expense_rejects_other_users_category() {
        let (service, _, categories) = service();
        let owner_id = Uuid::new_v4();
        let other_id = Uuid::new_v4();
        let category = categories.add(owner_id, "Food", true);

        let result = service
            .create_expense(other_id, request(category.id, "10.00"), ExpenseSource::Web)
            .await;
        assert!(matches!(result, Err(ExpenseError::CategoryNotFound)));
    }

    #[tokio::test]
    async fn test_create_expense_rejects_inactive_category() {
        let (service, _, categories) = service();
        let user_id = Uuid::new_v4();
        let category = categories.add(user_id, "Food", false);

        let result = service
            .create_expense(user_id, request(category.id, "10.00"), ExpenseSource::Web)
            .await;
        assert!(matches!(result, Err(ExpenseError::CategoryNotFound)));
    }

    #[tokio::test]
    async fn test_delete_is_soft_and_hides_from_listing() {
        let (service, expenses, categories) = service();
        let user_id = Uuid::new_v4();
        let category = categories.add(user_id, "Food", true);

        let expense = service
            .create_expense(user_id, request(category.id, "10.00"), ExpenseSource::Web)
            .await
            .unwrap();

        service.delete_expense(user_id, expense.id).await.unwrap();

        // The row survives with the flag set
        let stored = expenses.find_by_id(expense.id).await.unwrap().unwrap();
        assert!(stored.is_deleted);
        assert!(stored.deleted_at.is_some());

        assert!(service.list_recent(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_other_users_expense_unauthorized() {
        let (service, _, categories) = service();
        let owner_id = Uuid::new_v4();
        let other_id = Uuid::new_v4();
        let category = categories.add(owner_id, "Food", true);

        let expense = service
            .create_expense(owner_id, request(category.id, "10.00"), ExpenseSource::Web)
            .await
            .unwrap();

        let result = service.delete_expense(other_id, expense.id).await;
        assert!(matches!(result, Err(ExpenseError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_purge_removes_row() {
        let (service, expenses, categories) = service();
        let user_id = Uuid::new_v4();
        let category = categories.add(user_id, "Food", true);

        let expense = service
            .create_expense(user_id, request(category.id, "10.00"), ExpenseSource::Web)
            .await
            .unwrap();

        service.purge_expense(user_id, expense.id).await.unwrap();
        assert!(expenses.find_by_id(expense.id).await.unwrap().is_none());
    }

    #[test]
    fn test_week_start_is_monday_anchored() {
        // 2026-08-05 is a Wednesday
        let wednesday = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        assert_eq!(week_start(wednesday), NaiveDate::from_ymd_opt(2026, 8, 3).unwrap());

        // A Monday is its own week start
        let monday = NaiveDate::from_ymd_opt(2026, 8, 3).unwrap();
        assert_eq!(week_start(monday), monday);

        // A Sunday reaches back six days
        let sunday = NaiveDate::from_ymd_opt(2026, 8, 9).unwrap();
        assert_eq!(week_start(sunday), NaiveDate::from_ymd_opt(2026, 8, 3).unwrap());
    }

    #[test]
    fn test_month_start() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 15).unwrap();
        assert_eq!(month_start(date), NaiveDate::from_ymd_opt(2026, 8, 1).unwrap());
    }

    #[tokio::test]
    async fn test_dashboard_stats_windows() {
        let (service, _, categories) = service();
        let user_id = Uuid::new_v4();
        let category = categories.add(user_id, "Food", true);

        let today = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap(); // Wednesday

        for (amount, date) in [
            ("10.00", today),                                        // today
            ("20.00", NaiveDate::from_ymd_opt(2026, 8, 3).unwrap()), // Monday, this week
            ("40.00", NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()), // this month only
            ("80.00", NaiveDate::from_ymd_opt(2026, 7, 20).unwrap()), // last month
        ] {
            service
                .create_expense(
                    user_id,
                    CreateExpenseRequest {
                        category_id: category.id,
                        amount: Decimal::from_str(amount).unwrap(),
                        description: None,
                        date: Some(date),
                    },
                    ExpenseSource::Web,
                )
                .await
                .unwrap();
        }

        let stats = service.dashboard_stats(user_id, today).await.unwrap();
        assert_eq!(stats.today_total, Decimal::from_str("10.00").unwrap());
        assert_eq!(stats.week_total, Decimal::from_str("30.00").unwrap());
        assert_eq!(stats.month_total, Decimal::from_str("70.00").unwrap());
    }
}
