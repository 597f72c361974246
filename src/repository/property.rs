//! Property (hotel) repository.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::PropertyRecord;
use super::pool::{AsyncSqlitePool, DieselError};
use crate::models::Property;
use crate::schema::properties;

#[derive(Clone)]
pub struct PropertyRepository {
    pool: AsyncSqlitePool,
}

impl PropertyRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Property>, DieselError> {
        let mut conn = self.pool.get().await?;

        properties::table
            .find(id)
            .first::<PropertyRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Property::from))
    }

    pub async fn save(&self, property: &Property) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(properties::table)
            .values(PropertyRecord::from(property))
            .execute(&mut conn)
            .await?;

        Ok(())
    }
}
