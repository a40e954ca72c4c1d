//! Explicit transaction scope

use crate::error::DbResult;
use crate::traits::Database;
use log::{debug, warn};

/// An open transaction on a database.
///
/// Finish it with [`commit`](Self::commit) or [`rollback`](Self::rollback);
/// both consume the scope. A scope dropped while still open is reported,
/// since rolling back requires an async call.
pub struct Transaction<'a> {
    db: &'a dyn Database,
    open: bool,
}

impl<'a> Transaction<'a> {
    /// Begin a transaction on `db`
    pub async fn begin(db: &'a dyn Database) -> DbResult<Self> {
        db.begin().await?;
        debug!("Began transaction on {}", db.db_type());
        Ok(Self { db, open: true })
    }

    /// The database the transaction runs on
    pub fn database(&self) -> &'a dyn Database {
        self.db
    }

    /// Commit all work done in the scope
    pub async fn commit(mut self) -> DbResult<()> {
        self.open = false;
        self.db.commit().await?;
        debug!("Committed transaction on {}", self.db.db_type());
        Ok(())
    }

    /// Discard all work done in the scope
    pub async fn rollback(mut self) -> DbResult<()> {
        self.open = false;
        self.db.rollback().await?;
        debug!("Rolled back transaction on {}", self.db.db_type());
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.open {
            warn!(
                "Transaction on {} dropped without commit or rollback",
                self.db.db_type()
            );
        }
    }
}
