use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::mysql::MySqlDatabaseError;
use sqlx::{FromRow, MySql, MySqlPool, Transaction};

use super::{AllocationStore, LeaveRequestStore, LeaveStore, LeaveTransaction};
use crate::error::StoreError;
use crate::model::allocation::{Allocation, AllocationKey, AllocationPolicy};
use crate::model::leave_request::{
    LeavePage, LeaveQuery, LeaveRequest, LeaveStatus, NewLeaveRequest,
};
use crate::model::leave_type::LeaveType;

// MySQL error numbers for "Deadlock found" and "Lock wait timeout exceeded".
const ER_LOCK_DEADLOCK: u16 = 1213;
const ER_LOCK_WAIT_TIMEOUT: u16 = 1205;

fn classify(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if let Some(mysql_err) = db_err.try_downcast_ref::<MySqlDatabaseError>() {
            if matches!(mysql_err.number(), ER_LOCK_DEADLOCK | ER_LOCK_WAIT_TIMEOUT) {
                return StoreError::Conflict(mysql_err.message().to_string());
            }
        }
    }
    StoreError::Database(e)
}

#[derive(FromRow)]
struct AllocationRow {
    employee_id: u64,
    year: i32,
    leave_type: String,
    total: u32,
    used: u32,
}

impl From<AllocationRow> for Allocation {
    fn from(row: AllocationRow) -> Self {
        Allocation {
            key: AllocationKey::new(row.employee_id, row.year, LeaveType::normalize(&row.leave_type)),
            total: row.total,
            used: row.used,
        }
    }
}

#[derive(FromRow)]
struct LeaveRequestRow {
    id: u64,
    employee_id: u64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    leave_type: String,
    reason: String,
    status: String,
    approved_by: Option<u64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LeaveRequestRow> for LeaveRequest {
    type Error = StoreError;

    fn try_from(row: LeaveRequestRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<LeaveStatus>().map_err(|_| {
            StoreError::Corrupt(format!("leave request {} has status {:?}", row.id, row.status))
        })?;

        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            start_date: row.start_date,
            end_date: row.end_date,
            leave_type: LeaveType::normalize(&row.leave_type),
            reason: row.reason,
            status,
            approved_by: row.approved_by,
            created_at: row.created_at,
        })
    }
}

const REQUEST_COLUMNS: &str =
    "id, employee_id, start_date, end_date, leave_type, reason, status, approved_by, created_at";

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

/// MySQL-backed leave store; every unit of work is one database transaction.
#[derive(Clone)]
pub struct MySqlLeaveStore {
    pool: MySqlPool,
    policy: Arc<AllocationPolicy>,
}

impl MySqlLeaveStore {
    pub fn new(pool: MySqlPool, policy: AllocationPolicy) -> Self {
        Self {
            pool,
            policy: Arc::new(policy),
        }
    }
}

pub struct MySqlTransaction {
    tx: Option<Transaction<'static, MySql>>,
    policy: Arc<AllocationPolicy>,
}

impl MySqlTransaction {
    fn conn(&mut self) -> Result<&mut Transaction<'static, MySql>, StoreError> {
        self.tx.as_mut().ok_or(StoreError::Finished)
    }
}

#[async_trait]
impl AllocationStore for MySqlTransaction {
    async fn get_or_create(&mut self, key: &AllocationKey) -> Result<Allocation, StoreError> {
        let default_total = self.policy.default_for(&key.leave_type);
        let tx = self.conn()?;

        // The no-op update takes the row's exclusive lock when it already exists,
        // so concurrent callers queue here instead of deadlocking on a shared lock.
        sqlx::query(
            r#"
            INSERT INTO leave_allocations (employee_id, year, leave_type, total, used)
            VALUES (?, ?, ?, ?, 0)
            ON DUPLICATE KEY UPDATE used = used
            "#,
        )
        .bind(key.employee_id)
        .bind(key.year)
        .bind(key.leave_type.as_str())
        .bind(default_total)
        .execute(&mut **tx)
        .await
        .map_err(classify)?;

        let row = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT employee_id, year, leave_type, total, used
            FROM leave_allocations
            WHERE employee_id = ? AND year = ? AND leave_type = ?
            FOR UPDATE
            "#,
        )
        .bind(key.employee_id)
        .bind(key.year)
        .bind(key.leave_type.as_str())
        .fetch_one(&mut **tx)
        .await
        .map_err(classify)?;

        Ok(row.into())
    }

    async fn write_used(&mut self, key: &AllocationKey, used: u32) -> Result<(), StoreError> {
        let tx = self.conn()?;
        sqlx::query(
            r#"
            UPDATE leave_allocations
            SET used = ?
            WHERE employee_id = ? AND year = ? AND leave_type = ?
            "#,
        )
        .bind(used)
        .bind(key.employee_id)
        .bind(key.year)
        .bind(key.leave_type.as_str())
        .execute(&mut **tx)
        .await
        .map_err(classify)?;
        Ok(())
    }
}

#[async_trait]
impl LeaveRequestStore for MySqlTransaction {
    async fn insert_request(&mut self, new: NewLeaveRequest) -> Result<LeaveRequest, StoreError> {
        let tx = self.conn()?;
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, start_date, end_date, leave_type, reason, status)
            VALUES (?, ?, ?, ?, ?, 'pending')
            "#,
        )
        .bind(new.employee_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.leave_type.as_str())
        .bind(&new.reason)
        .execute(&mut **tx)
        .await
        .map_err(classify)?;

        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ?");
        let row = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(result.last_insert_id())
            .fetch_one(&mut **tx)
            .await
            .map_err(classify)?;

        row.try_into()
    }

    async fn lock_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        let tx = self.conn()?;
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ? FOR UPDATE");
        let row = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(classify)?;

        row.map(LeaveRequest::try_from).transpose()
    }

    async fn write_status(
        &mut self,
        id: u64,
        status: LeaveStatus,
        approved_by: Option<u64>,
    ) -> Result<(), StoreError> {
        let tx = self.conn()?;
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, approved_by = ?
            WHERE id = ?
            "#,
        )
        .bind(status.to_string())
        .bind(approved_by)
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(classify)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotLocked(id));
        }
        Ok(())
    }
}

#[async_trait]
impl LeaveTransaction for MySqlTransaction {
    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::Finished)?;
        tx.commit().await.map_err(classify)
    }
}

#[async_trait]
impl LeaveStore for MySqlLeaveStore {
    async fn begin(&self) -> Result<Box<dyn LeaveTransaction>, StoreError> {
        let tx = self.pool.begin().await.map_err(classify)?;
        Ok(Box::new(MySqlTransaction {
            tx: Some(tx),
            policy: Arc::clone(&self.policy),
        }))
    }

    async fn find_allocations(&self, employee_id: u64, year: i32) -> Result<Vec<Allocation>, StoreError> {
        let rows = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT employee_id, year, leave_type, total, used
            FROM leave_allocations
            WHERE employee_id = ? AND year = ?
            "#,
        )
        .bind(employee_id)
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        Ok(rows.into_iter().map(Allocation::from).collect())
    }

    async fn find_request(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ?");
        let row = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;

        row.map(LeaveRequest::try_from).transpose()
    }

    async fn list_requests(&self, query: &LeaveQuery) -> Result<LeavePage, StoreError> {
        let status = query.status.map(|s| s.to_string());

        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(emp_id) = query.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(emp_id));
        }

        if let Some(status) = status.as_deref() {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(status));
        }

        match query.visible_to.as_deref() {
            Some([]) => where_sql.push_str(" AND 1=0"),
            Some(employees) => {
                let placeholders = vec!["?"; employees.len()].join(", ");
                where_sql.push_str(&format!(" AND employee_id IN ({placeholders})"));
                args.extend(employees.iter().map(|id| FilterValue::U64(*id)));
            }
            None => {}
        }

        let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", where_sql);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(*s),
            };
        }
        let total = count_q.fetch_one(&self.pool).await.map_err(classify)?;

        let data_sql = format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM leave_requests
            {where_sql}
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#
        );
        let mut data_q = sqlx::query_as::<_, LeaveRequestRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Str(s) => data_q.bind(s),
            };
        }

        let rows = data_q
            .bind(query.per_page)
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;

        let data = rows
            .into_iter()
            .map(LeaveRequest::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LeavePage {
            data,
            page: query.page,
            per_page: query.per_page,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }
}
