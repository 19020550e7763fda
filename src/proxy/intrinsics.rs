//! Object intrinsics shared by every proxy
//!
//! Type query, hash code, string form, equality and the monitor primitives are
//! answered the same way regardless of what is being proxied, and before any
//! property classification happens. Equality is reference equality of the
//! proxy instance.

use crate::error::{ProxyError, Result};
use crate::proxy::call::{Argument, Reply};
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

const GET_CLASS: &str = "getClass";
const HASHCODE: &str = "hashCode";
const TO_STRING: &str = "toString";
const EQUALS: &str = "equals";
const NOTIFY: &str = "notify";
const NOTIFY_ALL: &str = "notifyAll";
const WAIT: &str = "wait";

const NANOS_PER_MILLI: u64 = 1_000_000;

/// Call that belongs to the object itself rather than to a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    TypeName,
    HashCode,
    ToString,
    Equals,
    Notify,
    NotifyAll,
    Wait,
}

impl Intrinsic {
    /// Recognize an intrinsic by name and argument count
    pub fn recognize(name: &str, arity: usize) -> Option<Self> {
        match (arity, name) {
            (0, GET_CLASS) => Some(Intrinsic::TypeName),
            (0, HASHCODE) => Some(Intrinsic::HashCode),
            (0, TO_STRING) => Some(Intrinsic::ToString),
            (0, NOTIFY) => Some(Intrinsic::Notify),
            (0, NOTIFY_ALL) => Some(Intrinsic::NotifyAll),
            (1, EQUALS) => Some(Intrinsic::Equals),
            (0..=2, WAIT) => Some(Intrinsic::Wait),
            _ => None,
        }
    }
}

/// Wait/notify monitor
pub(crate) struct Monitor {
    generation: Mutex<u64>,
    signal: Condvar,
}

impl Monitor {
    pub(crate) fn new() -> Self {
        Self {
            generation: Mutex::new(0),
            signal: Condvar::new(),
        }
    }

    /// Block until notified or until `timeout` elapses; true when notified
    pub(crate) fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut generation = self.generation.lock();
        let start = *generation;
        match timeout {
            None => {
                while *generation == start {
                    self.signal.wait(&mut generation);
                }
                true
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while *generation == start {
                    if self.signal.wait_until(&mut generation, deadline).timed_out() {
                        return *generation != start;
                    }
                }
                true
            }
        }
    }

    pub(crate) fn notify(&self) {
        let mut generation = self.generation.lock();
        *generation = generation.wrapping_add(1);
        self.signal.notify_one();
    }

    pub(crate) fn notify_all(&self) {
        let mut generation = self.generation.lock();
        *generation = generation.wrapping_add(1);
        self.signal.notify_all();
    }
}

/// Intrinsic state of one proxy
pub(crate) struct ObjectIntrinsics {
    label: &'static str,
    type_name: String,
    hash: u64,
    monitor: Monitor,
}

impl ObjectIntrinsics {
    pub(crate) fn new(label: &'static str, type_name: impl Into<String>, hash: u64) -> Self {
        Self {
            label,
            type_name: type_name.into(),
            hash,
            monitor: Monitor::new(),
        }
    }

    pub(crate) fn type_name(&self) -> &str {
        &self.type_name
    }

    pub(crate) fn hash(&self) -> u64 {
        self.hash
    }

    /// String form: `Kind{type@hash}`
    pub(crate) fn describe(&self) -> String {
        format!("{}{{{}@{:x}}}", self.label, self.type_name, self.hash)
    }

    /// Fully service an intrinsic call made against the proxy at `receiver`
    pub(crate) fn answer(
        &self,
        receiver: *const (),
        intrinsic: Intrinsic,
        args: &[Argument],
    ) -> Result<Reply> {
        match intrinsic {
            Intrinsic::TypeName => Ok(Reply::TypeName(self.type_name.clone())),
            Intrinsic::HashCode => Ok(Reply::Hash(self.hash)),
            Intrinsic::ToString => Ok(Reply::Text(self.describe())),
            Intrinsic::Equals => Ok(Reply::Bool(matches!(
                args.first(),
                Some(Argument::Proxy(handle)) if handle.addr() == receiver
            ))),
            Intrinsic::Notify => {
                self.monitor.notify();
                Ok(Reply::Void)
            }
            Intrinsic::NotifyAll => {
                self.monitor.notify_all();
                Ok(Reply::Void)
            }
            Intrinsic::Wait => {
                self.monitor.wait(wait_timeout(args)?);
                Ok(Reply::Void)
            }
        }
    }
}

/// Timeout selected by the wait overload; zero means wait until notified
fn wait_timeout(args: &[Argument]) -> Result<Option<Duration>> {
    let (millis, nanos) = match args {
        [] => return Ok(None),
        [millis] => (millis.as_u64()?, 0),
        [millis, nanos] => (millis.as_u64()?, nanos.as_u64()?),
        _ => {
            return Err(ProxyError::InvalidArgument(format!(
                "wait takes at most 2 arguments, got {}",
                args.len()
            )))
        }
    };
    if nanos >= NANOS_PER_MILLI {
        return Err(ProxyError::InvalidArgument(format!(
            "nanosecond timeout value out of range: {}",
            nanos
        )));
    }
    if millis == 0 && nanos == 0 {
        return Ok(None);
    }
    Ok(Some(Duration::from_millis(millis) + Duration::from_nanos(nanos)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_recognize_by_name_and_arity() {
        assert_eq!(Intrinsic::recognize("getClass", 0), Some(Intrinsic::TypeName));
        assert_eq!(Intrinsic::recognize("hashCode", 0), Some(Intrinsic::HashCode));
        assert_eq!(Intrinsic::recognize("toString", 0), Some(Intrinsic::ToString));
        assert_eq!(Intrinsic::recognize("equals", 1), Some(Intrinsic::Equals));
        assert_eq!(Intrinsic::recognize("notifyAll", 0), Some(Intrinsic::NotifyAll));
        assert_eq!(Intrinsic::recognize("wait", 0), Some(Intrinsic::Wait));
        assert_eq!(Intrinsic::recognize("wait", 2), Some(Intrinsic::Wait));

        assert_eq!(Intrinsic::recognize("wait", 3), None);
        assert_eq!(Intrinsic::recognize("equals", 0), None);
        assert_eq!(Intrinsic::recognize("hashCode", 1), None);
        assert_eq!(Intrinsic::recognize("getTitle", 0), None);
    }

    #[test]
    fn test_describe_and_hash() {
        let intrinsics = ObjectIntrinsics::new("EntityProxy", "Book", 0xbeef);
        assert_eq!(intrinsics.describe(), "EntityProxy{Book@beef}");

        let reply = intrinsics.answer(std::ptr::null(), Intrinsic::HashCode, &[]).unwrap();
        assert!(matches!(reply, Reply::Hash(0xbeef)));

        let reply = intrinsics.answer(std::ptr::null(), Intrinsic::TypeName, &[]).unwrap();
        assert!(matches!(reply, Reply::TypeName(name) if name == "Book"));
    }

    #[test]
    fn test_equality_needs_a_proxy_argument() {
        let intrinsics = ObjectIntrinsics::new("ValueProxy", "Point", 1);
        let reply = intrinsics
            .answer(std::ptr::null(), Intrinsic::Equals, &[Argument::Value(json!(1))])
            .unwrap();
        assert_eq!(reply.as_bool(), Some(false));
    }

    #[test]
    fn test_wait_timeout_overloads() {
        assert_eq!(wait_timeout(&[]).unwrap(), None);
        assert_eq!(wait_timeout(&[Argument::Value(json!(0))]).unwrap(), None);
        assert_eq!(
            wait_timeout(&[Argument::Value(json!(5))]).unwrap(),
            Some(Duration::from_millis(5))
        );
        assert_eq!(
            wait_timeout(&[Argument::Value(json!(1)), Argument::Value(json!(500))]).unwrap(),
            Some(Duration::from_millis(1) + Duration::from_nanos(500))
        );
        assert!(wait_timeout(&[Argument::Value(json!(1)), Argument::Value(json!(1_000_000))]).is_err());
    }

    #[test]
    fn test_timed_wait_expires() {
        let monitor = Monitor::new();
        let started = Instant::now();
        assert!(!monitor.wait(Some(Duration::from_millis(20))));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_notify_wakes_waiter() {
        let monitor = Arc::new(Monitor::new());
        let waiter = {
            let monitor = monitor.clone();
            thread::spawn(move || monitor.wait(Some(Duration::from_secs(5))))
        };

        // Keep notifying until the waiter has observed it
        while !waiter.is_finished() {
            monitor.notify_all();
            thread::sleep(Duration::from_millis(5));
        }
        assert!(waiter.join().unwrap());
    }
}
