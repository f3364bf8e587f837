//! Synthetic products and promotions for exercising the benchmark.
//!
//! Every tenth product is retired. Promotions rotate through three date
//! windows relative to the reference date: the current month, the previous
//! month and the next month, so roughly a third of them are active.

use chrono::{Datelike, Months, NaiveDate};
use promobench_common::MAX_GENERATE_ROWS;

use crate::error::ServerError;
use crate::format_date;
use crate::store::{Product, Promotion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratePlan {
    pub product_count: u32,
    pub promotion_count: u32,
    pub reference_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub products: Vec<Product>,
    pub promotions: Vec<Promotion>,
}

/// Position of a promotion's window relative to the reference month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Current,
    Past,
    Future,
}

impl Window {
    pub fn for_index(i: u32) -> Self {
        match i % 3 {
            0 => Window::Current,
            1 => Window::Past,
            _ => Window::Future,
        }
    }
}

/// Validate an optional row-count parameter, falling back to `default`.
pub fn validate_count(field: &'static str, raw: Option<i64>, default: u32) -> Result<u32, ServerError> {
    let got = raw.unwrap_or(i64::from(default));
    if got < 1 || got > i64::from(MAX_GENERATE_ROWS) {
        return Err(ServerError::InvalidCount { field, got, max: MAX_GENERATE_ROWS });
    }
    Ok(got as u32)
}

pub fn product_code(i: u32) -> String {
    format!("P{i:06}")
}

/// First and last day of the month `offset` months away from `date`'s month.
pub fn month_window(date: NaiveDate, offset: i32) -> Option<(NaiveDate, NaiveDate)> {
    let first = date.with_day(1)?;
    let start = if offset >= 0 {
        first.checked_add_months(Months::new(offset as u32))?
    } else {
        first.checked_sub_months(Months::new(offset.unsigned_abs()))?
    };
    let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
    Some((start, end))
}

pub fn build_dataset(plan: &GeneratePlan) -> Result<Dataset, ServerError> {
    if plan.product_count == 0 {
        return Err(ServerError::InvalidCount { field: "productCount", got: 0, max: MAX_GENERATE_ROWS });
    }

    let window_dates = |offset: i32| {
        month_window(plan.reference_date, offset)
            .map(|(start, end)| (format_date(start), format_date(end)))
            .ok_or_else(|| {
                ServerError::Internal(format!("date out of range near {}", plan.reference_date))
            })
    };
    let current = window_dates(0)?;
    let past = window_dates(-1)?;
    let future = window_dates(1)?;

    let products = (1..=plan.product_count)
        .map(|i| Product {
            prod_cd: product_code(i),
            prod_nm: format!("테스트상품{i}"),
            use_yn: if i % 10 == 0 { "N" } else { "Y" }.to_string(),
        })
        .collect();

    let promotions = (1..=plan.promotion_count)
        .map(|i| {
            let (start_dt, end_dt) = match Window::for_index(i) {
                Window::Current => &current,
                Window::Past => &past,
                Window::Future => &future,
            };
            Promotion {
                id: 0,
                prod_cd: product_code(i % plan.product_count + 1),
                promo_price: 10_000 + i64::from(i) * 100,
                start_dt: start_dt.clone(),
                end_dt: end_dt.clone(),
            }
        })
        .collect();

    Ok(Dataset { products, promotions })
}
