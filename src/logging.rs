use std::sync::atomic::AtomicU64;

use lazy_static::lazy_static;

lazy_static! {
    pub static ref CALL_ID: AtomicU64 = AtomicU64::new(0);
}

/// Starts a traced operation and returns its call id.
#[macro_export]
macro_rules! log_call {
    ($call:literal, $($arg:expr),* $(,)?) => {{
        let id = $crate::logging::CALL_ID.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        log::debug!("{}({}): {}", $call, format!($($arg,)*), id);
        id
    }};
}

#[macro_export]
macro_rules! log_more {
    ($callid: ident, $($arg:expr),* $(,)?) => {{
        log::trace!(" {} : {}", $callid, format!($($arg,)*));
    }};
}

#[macro_export]
macro_rules! log_res {
    ($callid: ident, $($arg:expr),* $(,)?) => {{
        log::debug!(" {} => {}", $callid, format!($($arg,)*));
    }};
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::CALL_ID;

    #[test]
    fn call_ids_increase() {
        let a = log_call!("TEST", "x={}", 1);
        let b = log_call!("TEST", "x={}", 2);
        assert!(b > a);
        assert!(CALL_ID.load(Ordering::SeqCst) > b);
        log_more!(a, "more");
        log_res!(b, "{:?}", Ok::<(), ()>(()));
    }
}
