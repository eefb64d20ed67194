use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::UserDirectory;
use crate::domain::user::User;
use crate::schema::users;

use super::models::UserRow;

pub struct PgUserDirectory {
    pool: DbPool,
}

impl PgUserDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UserDirectory for PgUserDirectory {
    fn insert(&self, user: User) -> Result<User, DomainError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(users::table)
            .values(&UserRow::from(&user))
            .returning(UserRow::as_returning())
            .get_result(&mut conn)?
            .into_domain()
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;
        users::table
            .find(id)
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(UserRow::into_domain)
            .transpose()
    }

    fn list(&self) -> Result<Vec<User>, DomainError> {
        let mut conn = self.pool.get()?;
        users::table
            .select(UserRow::as_select())
            .order((users::created_at.asc(), users::id.asc()))
            .load::<UserRow>(&mut conn)?
            .into_iter()
            .map(UserRow::into_domain)
            .collect()
    }

    fn set_approved(&self, id: Uuid, approved: bool) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;
        diesel::update(users::table.find(id))
            .set(users::approved.eq(approved))
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(UserRow::into_domain)
            .transpose()
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(users::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}
