use crate::error::{Error, Result};
use crate::model::{MAX_PRIORITY, MIN_PRIORITY};

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_DESCRIPTION_LEN: usize = 2000;
pub const MAX_CATEGORY_NAME_LEN: usize = 100;
/// Positions must stay below 2^53, where `f64` still represents every whole
/// number and `index + 1.0` is strictly greater than `index`.
pub const ORDER_INDEX_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Trim a task title and check it is non-empty and within length.
/// Returns the trimmed title.
pub fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid("title", "must not be empty or whitespace only"));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(Error::invalid(
            "title",
            format!("must be at most {MAX_TITLE_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_description(description: Option<&str>) -> Result<()> {
    if let Some(d) = description {
        if d.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(Error::invalid(
                "description",
                format!("must be at most {MAX_DESCRIPTION_LEN} characters"),
            ));
        }
    }
    Ok(())
}

pub fn validate_priority(priority: u8) -> Result<()> {
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        return Err(Error::invalid(
            "priority",
            format!("{priority} is outside {MIN_PRIORITY}..={MAX_PRIORITY}"),
        ));
    }
    Ok(())
}

/// NaN and infinities have no place in a total order.
pub fn validate_order_index(index: f64) -> Result<()> {
    if !index.is_finite() {
        return Err(Error::invalid("order_index", format!("{index} is not finite")));
    }
    if index.abs() >= ORDER_INDEX_LIMIT {
        return Err(Error::invalid(
            "order_index",
            format!("{index} is outside (-2^53, 2^53)"),
        ));
    }
    Ok(())
}

pub fn validate_category_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid("name", "must not be empty"));
    }
    if trimmed.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(Error::invalid(
            "name",
            format!("must be at most {MAX_CATEGORY_NAME_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Validate a `#RRGGBB` colour.
pub fn validate_color(color: &str) -> Result<()> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(Error::invalid("color", format!("'{color}' is not #RRGGBB")));
    }
    Ok(())
}
