use crate::error::{AppError, Result};

/// Parse `userIds` query values.
///
/// Each value is either a single id or a list (`1,2,3` or `[1,2,3]`), so both
/// `?userIds=1,2` and `?userIds=1&userIds=2` are accepted. Batch size and
/// duplicates are left to the service.
pub fn parse_user_ids<S: AsRef<str>>(values: &[S]) -> Result<Vec<i64>> {
    let mut ids = Vec::new();

    for value in values {
        let trimmed = value.as_ref().trim();
        let inner = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(trimmed);

        for part in inner.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let id = part
                .parse::<i64>()
                .ok()
                .filter(|id| *id > 0)
                .ok_or_else(|| AppError::invalid_input(format!("Invalid user id: {}", part)))?;
            ids.push(id);
        }
    }

    if ids.is_empty() {
        return Err(AppError::invalid_input("At least one user id is required"));
    }
    Ok(ids)
}
