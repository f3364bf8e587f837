use std::path::Path;

use promobench_common::PromotionProduct;
use rusqlite::{named_params, params, Connection, Row};

use crate::error::ServerError;

/// Row of `TB_PRODUCT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub prod_cd: String,
    pub prod_nm: String,
    /// `"Y"` when the product is in use.
    pub use_yn: String,
}

/// Row of `TB_PROMOTION`. `id` is assigned by the database and ignored on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    pub id: i64,
    pub prod_cd: String,
    pub promo_price: i64,
    pub start_dt: String,
    pub end_dt: String,
}

/// Subquery over a comma join; the reference date is derived inside the database.
const LEGACY_SQL: &str = r#"
    SELECT *
    FROM (
        SELECT A.PROD_CD, A.PROD_NM, B.PROMO_PRICE, B.START_DT, B.END_DT
        FROM TB_PRODUCT A, TB_PROMOTION B
        WHERE A.PROD_CD = B.PROD_CD
        AND A.USE_YN = 'Y'
    )
    WHERE strftime('%Y%m%d', 'now', 'localtime') BETWEEN START_DT AND END_DT
"#;

const OPTIMIZED_SQL: &str = r#"
    SELECT A.PROD_CD, A.PROD_NM, B.PROMO_PRICE, B.START_DT, B.END_DT
    FROM TB_PRODUCT A
    INNER JOIN TB_PROMOTION B ON A.PROD_CD = B.PROD_CD
    WHERE A.USE_YN = 'Y'
    AND B.START_DT <= ?1
    AND B.END_DT >= ?1
"#;

const ACTIVE_ENTITIES_SQL: &str = r#"
    SELECT B.ID, B.PROD_CD, B.PROMO_PRICE, B.START_DT, B.END_DT,
           A.PROD_CD, A.PROD_NM, A.USE_YN
    FROM TB_PROMOTION B
    INNER JOIN TB_PRODUCT A ON B.PROD_CD = A.PROD_CD
    WHERE A.USE_YN = 'Y'
    AND B.START_DT <= :current_date
    AND B.END_DT >= :current_date
"#;

pub fn ensure_schema(conn: &Connection) -> Result<(), ServerError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS TB_PRODUCT (
            PROD_CD TEXT PRIMARY KEY,
            PROD_NM TEXT,
            USE_YN  TEXT
        );
        CREATE TABLE IF NOT EXISTS TB_PROMOTION (
            ID          INTEGER PRIMARY KEY AUTOINCREMENT,
            PROD_CD     TEXT,
            PROMO_PRICE INTEGER,
            START_DT    TEXT,
            END_DT      TEXT
        );
        CREATE INDEX IF NOT EXISTS IDX_PROMO_DATE ON TB_PROMOTION(START_DT, END_DT);
        CREATE INDEX IF NOT EXISTS IDX_PROMO_PROD ON TB_PROMOTION(PROD_CD);
        "#,
    )?;
    Ok(())
}

/// SQLite-backed access to products and their promotions.
pub struct PromotionStore {
    conn: Connection,
}

impl PromotionStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ServerError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, ServerError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, ServerError> {
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Active promotions via the legacy subquery, evaluated against the database's own clock.
    pub fn fetch_legacy(&self) -> Result<Vec<PromotionProduct>, ServerError> {
        let mut stmt = self.conn.prepare(LEGACY_SQL)?;
        let rows = stmt.query_map([], row_to_promotion_product)?;
        let out = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(out)
    }

    /// Active promotions on `reference_date` (`YYYYMMDD`) via the indexed join.
    pub fn fetch_optimized(&self, reference_date: &str) -> Result<Vec<PromotionProduct>, ServerError> {
        let mut stmt = self.conn.prepare(OPTIMIZED_SQL)?;
        let rows = stmt.query_map(params![reference_date], row_to_promotion_product)?;
        let out = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(out)
    }

    /// Active promotions on `reference_date`, read as entity pairs and projected
    /// into wire records. Backs the public promotions endpoint.
    pub fn find_active_promotions(
        &self,
        reference_date: &str,
    ) -> Result<Vec<PromotionProduct>, ServerError> {
        let mut stmt = self.conn.prepare(ACTIVE_ENTITIES_SQL)?;
        let rows = stmt.query_map(
            named_params! { ":current_date": reference_date },
            row_to_entities,
        )?;
        let mut out = Vec::new();
        for row in rows {
            let (promotion, product) = row?;
            out.push(project(promotion, product));
        }
        Ok(out)
    }

    /// Replace the contents of both tables in a single transaction.
    pub fn replace_all(
        &mut self,
        products: &[Product],
        promotions: &[Promotion],
    ) -> Result<(), ServerError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM TB_PROMOTION", [])?;
        tx.execute("DELETE FROM TB_PRODUCT", [])?;
        {
            let mut insert_product =
                tx.prepare("INSERT INTO TB_PRODUCT (PROD_CD, PROD_NM, USE_YN) VALUES (?1, ?2, ?3)")?;
            for product in products {
                insert_product.execute(params![product.prod_cd, product.prod_nm, product.use_yn])?;
            }
            let mut insert_promotion = tx.prepare(
                "INSERT INTO TB_PROMOTION (PROD_CD, PROMO_PRICE, START_DT, END_DT) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for promotion in promotions {
                insert_promotion.execute(params![
                    promotion.prod_cd,
                    promotion.promo_price,
                    promotion.start_dt,
                    promotion.end_dt,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Row counts of `(TB_PRODUCT, TB_PROMOTION)`.
    pub fn counts(&self) -> Result<(u64, u64), ServerError> {
        let products: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM TB_PRODUCT", [], |row| row.get(0))?;
        let promotions: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM TB_PROMOTION", [], |row| row.get(0))?;
        Ok((products as u64, promotions as u64))
    }
}

fn row_to_promotion_product(row: &Row<'_>) -> rusqlite::Result<PromotionProduct> {
    Ok(PromotionProduct {
        prod_cd: row.get(0)?,
        prod_nm: row.get(1)?,
        promo_price: row.get(2)?,
        start_dt: row.get(3)?,
        end_dt: row.get(4)?,
    })
}

fn row_to_entities(row: &Row<'_>) -> rusqlite::Result<(Promotion, Product)> {
    let promotion = Promotion {
        id: row.get(0)?,
        prod_cd: row.get(1)?,
        promo_price: row.get(2)?,
        start_dt: row.get(3)?,
        end_dt: row.get(4)?,
    };
    let product = Product {
        prod_cd: row.get(5)?,
        prod_nm: row.get(6)?,
        use_yn: row.get(7)?,
    };
    Ok((promotion, product))
}

fn project(promotion: Promotion, product: Product) -> PromotionProduct {
    PromotionProduct {
        prod_cd: promotion.prod_cd,
        prod_nm: product.prod_nm,
        promo_price: promotion.promo_price,
        start_dt: promotion.start_dt,
        end_dt: promotion.end_dt,
    }
}
