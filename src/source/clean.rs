use super::record::Window;
use super::SourceError;

/// A window after cleaning, with the number of records it lost.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedWindow {
    pub window: Window,
    pub dropped: usize,
}

/// Keeps only records whose `required` fields are all present and non-null.
///
/// Retained records keep their relative order. Coercion failures were already
/// turned into nulls by the source, so they count as missing here.
pub fn clean_window(window: Window, required: &[&str]) -> Result<CleanedWindow, SourceError> {
    let indices = required
        .iter()
        .map(|name| {
            window
                .column_index(name)
                .ok_or_else(|| SourceError::MissingColumn {
                    column: (*name).to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let before = window.len();
    let columns = window.columns().clone();
    let kept: Vec<_> = window
        .into_records()
        .into_iter()
        .filter(|record| {
            indices
                .iter()
                .all(|&idx| record.get(idx).is_some_and(|v| !v.is_null()))
        })
        .collect();

    let dropped = before - kept.len();
    Ok(CleanedWindow {
        window: Window::new(columns, kept),
        dropped,
    })
}
