use anyhow::Result;

use dongne_types::api::NewCategory;
use dongne_types::models::{Category, CategoryId};

use super::unique_conflict;
use crate::Database;
use crate::models::{category_at, category_cols};

impl Database {
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM categories c ORDER BY c.name, c.id",
                category_cols("c")
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], |row| category_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn create_category(&self, new: &NewCategory) -> Result<Category> {
        self.with_conn_mut(|conn| {
            let sql = format!(
                "INSERT INTO categories (name, slug) VALUES (?1, ?2) RETURNING {}",
                category_cols("")
            );
            conn.query_row(&sql, (&new.name, &new.slug), |row| category_at(row, 0))
                .map_err(|e| unique_conflict(e, "category slug"))
        })
    }

    pub fn category_exists(&self, id: CategoryId) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1)",
                [id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::is_conflict;
    use crate::testutil::open_temp;
    use dongne_types::api::NewCategory;

    #[test]
    fn categories_sorted_by_name_and_slug_unique() {
        let (_dir, db) = open_temp();
        db.create_category(&NewCategory { name: "Sports".into(), slug: "sports".into() })
            .unwrap();
        db.create_category(&NewCategory { name: "Books".into(), slug: "books".into() })
            .unwrap();

        let names: Vec<_> = db
            .list_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["Books", "Sports"]);

        let books = db.list_categories().unwrap()[0].id;
        assert!(db.category_exists(books).unwrap());
        assert!(!db.category_exists(books + 50).unwrap());

        let err = db
            .create_category(&NewCategory { name: "More books".into(), slug: "books".into() })
            .unwrap_err();
        assert!(is_conflict(&err));
    }
}
