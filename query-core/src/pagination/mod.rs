mod window;

pub use window::*;

use crate::{FieldSelection, PaginationError};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

const CURSOR_PREFIX: &str = "arrayconnection:";

/// Which cursor argument a decode failure should be reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorArg {
    After,
    Before,
}

/// The raw pagination arguments as they arrive on a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationArgs {
    pub first: Option<i64>,
    pub last: Option<i64>,
    pub offset: Option<i64>,
    pub after: Option<String>,
    pub before: Option<String>,
}

impl PaginationArgs {
    /// Pulls the recognized pagination arguments off a field selection.
    pub fn from_field(field: &FieldSelection) -> Self {
        Self {
            first: field.lookup_argument("first").and_then(|v| v.as_int()),
            last: field.lookup_argument("last").and_then(|v| v.as_int()),
            offset: field.lookup_argument("offset").and_then(|v| v.as_int()),
            after: field.lookup_argument("after").and_then(|v| v.as_str()).map(str::to_owned),
            before: field.lookup_argument("before").and_then(|v| v.as_str()).map(str::to_owned),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none()
            && self.last.is_none()
            && self.offset.is_none()
            && self.after.is_none()
            && self.before.is_none()
    }
}

/// The validated, normalized slice. `after` has already absorbed the
/// inclusive-to-exclusive shift (and any `offset`), so it is the 0-based
/// slice start; `before` is the 0-based exclusive stop candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationSlice {
    pub after: Option<u64>,
    pub before: Option<u64>,
    pub first: Option<u64>,
    pub last: Option<u64>,
    /// The effective page size ceiling.
    pub size: Option<u64>,
}

/// Encodes an integer offset into its opaque wire form.
pub fn encode_cursor(offset: u64) -> String {
    BASE64.encode(format!("{CURSOR_PREFIX}{offset}"))
}

fn decode_cursor(cursor: &str, arg: CursorArg) -> Result<u64, PaginationError> {
    let missing = || match arg {
        CursorArg::After => PaginationError::AfterNotFound,
        CursorArg::Before => PaginationError::BeforeNotFound,
    };

    let bytes = BASE64.decode(cursor).map_err(|_| missing())?;
    let decoded = String::from_utf8(bytes).map_err(|_| missing())?;
    let offset = decoded.strip_prefix(CURSOR_PREFIX).ok_or_else(missing)?;

    offset.parse::<u64>().map_err(|_| missing())
}

/// Maps external pagination arguments to a normalized slice, with the
/// canonical failure taxonomy.
pub fn validate_pagination(
    args: &PaginationArgs,
    max_limit: Option<u64>,
) -> Result<PaginationSlice, PaginationError> {
    // Inclusive cursor to exclusive slice start.
    let after = args
        .after
        .as_deref()
        .map(|cursor| decode_cursor(cursor, CursorArg::After))
        .transpose()?
        .map(|offset| offset + 1);

    let before = args
        .before
        .as_deref()
        .map(|cursor| decode_cursor(cursor, CursorArg::Before))
        .transpose()?;

    if args.offset.is_some() && (after.is_some() || before.is_some()) {
        return Err(PaginationError::OffsetWithCursor);
    }

    if let Some(first) = args.first {
        if first < 1 {
            return Err(PaginationError::FirstNotPositive);
        }
        if let Some(max) = max_limit {
            if first as u64 > max {
                return Err(PaginationError::FirstExceedsMax { first, max });
            }
        }
    }

    if let Some(last) = args.last {
        if last < 1 {
            return Err(PaginationError::LastNotPositive);
        }
        if let Some(max) = max_limit {
            if last as u64 > max {
                return Err(PaginationError::LastExceedsMax { last, max });
            }
        }
    }

    if args.first.is_none() && args.last.is_none() && max_limit.is_none() {
        return Err(PaginationError::MissingFirstOrLast);
    }

    let offset = match args.offset {
        Some(offset) if offset < 0 => return Err(PaginationError::OffsetNotPositive),
        Some(offset) => Some(offset as u64),
        None => None,
    };

    // `offset = K` and `after` shifted both mean the same thing: the
    // 0-based slice start.
    let after = after.or(offset);

    if let (Some(start), Some(stop)) = (after, before) {
        if start > stop {
            return Err(PaginationError::AfterBeforeInverted);
        }
    }

    let first = args.first.map(|first| first as u64);
    let last = args.last.map(|last| last as u64);

    let size = match (first, last, max_limit) {
        (Some(first), _, Some(max)) => Some(first.min(max)),
        (Some(first), _, None) => Some(first),
        (None, Some(last), Some(max)) => Some(last.min(max)),
        (None, Some(last), None) => Some(last),
        (None, None, max) => max,
    };

    Ok(PaginationSlice {
        after,
        before,
        first,
        last,
        size,
    })
}

impl PaginationSlice {
    /// The 0-based inclusive start of the slice.
    pub fn start(&self) -> u64 {
        self.after.unwrap_or(0)
    }

    /// The 0-based exclusive stop, when it does not depend on the total.
    pub fn stop(&self) -> Option<u64> {
        let from_size = match (self.last, self.size) {
            // `last` counts from the end; the stop needs the total.
            (Some(_), _) => self.before,
            (None, Some(size)) => {
                let capped = self.start() + size;
                Some(self.before.map_or(capped, |before| before.min(capped)))
            }
            (None, None) => self.before,
        };

        from_size
    }

    /// Resolves the slice against a known total, yielding `(offset, limit)`
    /// for the row query.
    pub fn bounded(&self, total: u64) -> (u64, u64) {
        let mut start = self.start().min(total);
        let stop = self.stop().unwrap_or(total).min(total);

        if let Some(last) = self.last {
            start = start.max(stop.saturating_sub(last));
        }

        (start, stop.saturating_sub(start))
    }

    /// Re-externalizes the slice as wire arguments. Validating the result
    /// again is a fixpoint.
    pub fn to_args(&self) -> PaginationArgs {
        PaginationArgs {
            first: self.first.map(|first| first as i64),
            last: self.last.map(|last| last as i64),
            offset: None,
            // Undo the exclusive shift so re-validation lands on the same
            // slice.
            after: self.after.map(|after| encode_cursor(after - 1)),
            before: self.before.map(encode_cursor),
        }
    }
}
