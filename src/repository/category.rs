use chrono::Utc;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sqlite::SqliteConnection;

use crate::domain::category::{Category, CategoryPatch, NewCategory};
use crate::domain::types::{CategoryId, CategorySysname};
use crate::models::category::{
    Category as DbCategory, CategoryChangeset, NewCategory as DbNewCategory,
};
use crate::repository::{
    CategoryReader, CategoryStore, CategoryUnitOfWork, CategoryWriter, DieselRepository,
    DieselTransaction, RepositoryError, RepositoryResult,
};

fn into_domain(rows: Vec<DbCategory>) -> RepositoryResult<Vec<Category>> {
    Ok(rows
        .into_iter()
        .map(TryInto::try_into)
        .collect::<Result<Vec<Category>, _>>()?)
}

fn find_by_id(conn: &mut SqliteConnection, id: CategoryId) -> RepositoryResult<Option<Category>> {
    use crate::schema::categories;

    let category = categories::table
        .find(id.get())
        .first::<DbCategory>(conn)
        .optional()?;

    Ok(category.map(TryInto::try_into).transpose()?)
}

fn find_by_sysname(
    conn: &mut SqliteConnection,
    sysname: &CategorySysname,
) -> RepositoryResult<Option<Category>> {
    use crate::schema::categories;

    let category = categories::table
        .filter(categories::sysname.eq(sysname.as_str()))
        .first::<DbCategory>(conn)
        .optional()?;

    Ok(category.map(TryInto::try_into).transpose()?)
}

fn load_children(conn: &mut SqliteConnection, id: CategoryId) -> RepositoryResult<Vec<Category>> {
    use crate::schema::categories;

    let rows = categories::table
        .filter(categories::parent_id.eq(id.get()))
        .order(categories::id.asc())
        .load::<DbCategory>(conn)?;

    into_domain(rows)
}

fn load_all(conn: &mut SqliteConnection) -> RepositoryResult<Vec<Category>> {
    use crate::schema::categories;

    let rows = categories::table
        .order(categories::id.asc())
        .load::<DbCategory>(conn)?;

    into_domain(rows)
}

fn insert(conn: &mut SqliteConnection, category: &NewCategory) -> RepositoryResult<Category> {
    use crate::schema::categories;

    let db_category = DbNewCategory::from_domain(category.clone(), Utc::now().naive_utc());

    let row = diesel::insert_into(categories::table)
        .values(&db_category)
        .get_result::<DbCategory>(conn)?;

    Ok(row.try_into()?)
}

fn update(
    conn: &mut SqliteConnection,
    id: CategoryId,
    patch: &CategoryPatch,
) -> RepositoryResult<Option<Category>> {
    use crate::schema::categories;

    let changeset = CategoryChangeset::from_domain(patch.clone(), Utc::now().naive_utc());

    let row = diesel::update(categories::table.find(id.get()))
        .set(&changeset)
        .get_result::<DbCategory>(conn)
        .optional()?;

    Ok(row.map(TryInto::try_into).transpose()?)
}

fn delete(conn: &mut SqliteConnection, id: CategoryId) -> RepositoryResult<bool> {
    use crate::schema::categories;

    // Descendants still attached at this point go with the row through the
    // `ON DELETE CASCADE` foreign key.
    let affected = diesel::delete(categories::table.find(id.get())).execute(conn)?;

    Ok(affected > 0)
}

impl CategoryReader for DieselRepository {
    fn get_category_by_id(&self, id: CategoryId) -> RepositoryResult<Option<Category>> {
        let mut conn = self.conn()?;
        find_by_id(&mut conn, id)
    }

    fn get_category_by_sysname(
        &self,
        sysname: &CategorySysname,
    ) -> RepositoryResult<Option<Category>> {
        let mut conn = self.conn()?;
        find_by_sysname(&mut conn, sysname)
    }

    fn list_children(&self, id: CategoryId) -> RepositoryResult<Vec<Category>> {
        let mut conn = self.conn()?;
        load_children(&mut conn, id)
    }

    fn list_all_categories(&self) -> RepositoryResult<Vec<Category>> {
        let mut conn = self.conn()?;
        load_all(&mut conn)
    }
}

impl CategoryWriter for DieselRepository {
    fn create_category(&self, category: &NewCategory) -> RepositoryResult<Category> {
        let mut conn = self.conn()?;
        insert(&mut conn, category)
    }

    fn update_category(
        &self,
        id: CategoryId,
        patch: &CategoryPatch,
    ) -> RepositoryResult<Option<Category>> {
        let mut conn = self.conn()?;
        update(&mut conn, id, patch)
    }

    fn delete_category(&self, id: CategoryId) -> RepositoryResult<bool> {
        let mut conn = self.conn()?;
        delete(&mut conn, id)
    }
}

impl CategoryReader for DieselTransaction<'_> {
    fn get_category_by_id(&self, id: CategoryId) -> RepositoryResult<Option<Category>> {
        let mut conn = self.conn.borrow_mut();
        find_by_id(&mut conn, id)
    }

    fn get_category_by_sysname(
        &self,
        sysname: &CategorySysname,
    ) -> RepositoryResult<Option<Category>> {
        let mut conn = self.conn.borrow_mut();
        find_by_sysname(&mut conn, sysname)
    }

    fn list_children(&self, id: CategoryId) -> RepositoryResult<Vec<Category>> {
        let mut conn = self.conn.borrow_mut();
        load_children(&mut conn, id)
    }

    fn list_all_categories(&self) -> RepositoryResult<Vec<Category>> {
        let mut conn = self.conn.borrow_mut();
        load_all(&mut conn)
    }
}

impl CategoryWriter for DieselTransaction<'_> {
    fn create_category(&self, category: &NewCategory) -> RepositoryResult<Category> {
        let mut conn = self.conn.borrow_mut();
        insert(&mut conn, category)
    }

    fn update_category(
        &self,
        id: CategoryId,
        patch: &CategoryPatch,
    ) -> RepositoryResult<Option<Category>> {
        let mut conn = self.conn.borrow_mut();
        update(&mut conn, id, patch)
    }

    fn delete_category(&self, id: CategoryId) -> RepositoryResult<bool> {
        let mut conn = self.conn.borrow_mut();
        delete(&mut conn, id)
    }
}

/// Either the caller aborted the unit of work or the store failed while
/// opening/committing it.
enum TransactionError<E> {
    Aborted(E),
    Store(DieselError),
}

impl<E> From<DieselError> for TransactionError<E> {
    fn from(err: DieselError) -> Self {
        TransactionError::Store(err)
    }
}

impl CategoryUnitOfWork for DieselRepository {
    fn in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn CategoryStore) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut conn = self.conn()?;

        // `BEGIN IMMEDIATE` takes the write lock up front, so the validation
        // reads and the write below cannot interleave with another writer.
        let result = conn.immediate_transaction::<T, TransactionError<E>, _>(|conn| {
            let tx = DieselTransaction::new(conn);
            f(&tx).map_err(TransactionError::Aborted)
        });

        match result {
            Ok(value) => Ok(value),
            Err(TransactionError::Aborted(err)) => Err(err),
            Err(TransactionError::Store(err)) => Err(RepositoryError::from(err).into()),
        }
    }
}
