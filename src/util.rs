use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

macro_rules! tomlget_or {
    ($cfg:ident, $sec:expr, $key:expr, $conv:ident, $as:ty, $or:expr) => {
        $cfg.get($sec)
            .and_then(|sec| sec.get($key))
            .map(|val| val.$conv())
            .unwrap_or_else(|| {
                log::warn!(
                    "failed to find {}:{} in config; proceeding with default {:?}",
                    $sec,
                    $key,
                    $or
                );
                Some($or)
            })
            .unwrap_or_else(|| {
                log::warn!(
                    "failed to convert {}:{} to {}; proceeding with default {:?}",
                    $sec,
                    $key,
                    stringify!($as),
                    $or
                );
                $or
            }) as $as
    };
    ($cfg:ident, $sec:expr, $key:expr, as_str, $or:expr) => {
        $cfg.get($sec)
            .and_then(|sec| sec.get($key))
            .and_then(|val| val.as_str())
            .unwrap_or_else(|| {
                log::warn!(
                    "failed to read {}:{} as a string; proceeding with default {:?}",
                    $sec,
                    $key,
                    $or
                );
                $or
            })
    };
    ($cfg:ident, $sec:expr, $key:expr, as_bool, $or:expr) => {
        $cfg.get($sec)
            .and_then(|sec| sec.get($key))
            .map(|val| val.as_bool())
            .unwrap_or_else(|| {
                log::warn!(
                    "failed to find {}:{} in config; proceeding with default {:?}",
                    $sec,
                    $key,
                    $or
                );
                Some($or)
            })
            .unwrap_or_else(|| {
                log::warn!(
                    "failed to convert {}:{} to bool; proceeding with default {:?}",
                    $sec,
                    $key,
                    $or
                );
                $or
            })
    };
}

macro_rules! tomlget_opt {
    ($cfg:ident, $sec:expr, $key:expr, $conv:ident, $as:ty) => {
        $cfg.get($sec)
            .and_then(|sec| sec.get($key))
            .and_then(|val| val.$conv())
            .map(|val| val as $as)
    };
    ($cfg:ident, $sec:expr, $key:expr, as_str) => {
        $cfg.get($sec)
            .and_then(|sec| sec.get($key))
            .and_then(|val| val.as_str())
    };
}

macro_rules! tomlget {
    ($cfg:ident, $sec:expr, $key:expr, $conv:ident, $as:ty) => {
        $cfg.get($sec)
            .ok_or_else(|| format!("failed to get section {}", $sec))?
            .get($key)
            .ok_or_else(|| format!("failed to get key {}:{}", $sec, $key))?
            .$conv()
            .ok_or_else(|| format!("failed to convert {}:{} to {}", $sec, $key, stringify!($as)))?
            as $as
    };
    ($cfg:ident, $sec:expr, $key:expr, as_str) => {
        $cfg.get($sec)
            .ok_or_else(|| format!("failed to get section {}", $sec))?
            .get($key)
            .ok_or_else(|| format!("failed to get key {}:{}", $sec, $key))?
            .as_str()
            .ok_or_else(|| format!("failed to convert {}:{} to string", $sec, $key))?
    };
}

pub(crate) use {tomlget, tomlget_opt, tomlget_or};

/// Inclusive containment check used for frequency envelopes and current windows.
#[inline]
#[must_use]
pub fn in_range(value: f64, range: (f64, f64)) -> bool {
    value >= range.0 && value <= range.1
}

/// Settling delay after a hardware write. A zero duration is skipped entirely,
/// which is what the tests rely on.
pub fn settle_ms(ms: u64) {
    if ms > 0 {
        thread::sleep(Duration::from_millis(ms));
    }
}

pub fn find_file(file_name: &Path) -> Option<PathBuf> {
    if file_name.is_absolute() {
        if file_name.exists() {
            return Some(file_name.into());
        }
        return None;
    }
    if let Ok(cwd) = std::env::current_dir() {
        if cwd.join(file_name).exists() {
            return Some(cwd.join(file_name));
        }
    }
    if let Ok(exe) = std::env::current_exe() {
        if exe.parent()?.join(file_name).exists() {
            return Some(exe.parent()?.join(file_name));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_range_is_inclusive() {
        assert!(in_range(90.0, (90.0, 150.0)));
        assert!(in_range(150.0, (90.0, 150.0)));
        assert!(in_range(110.0, (90.0, 150.0)));
        assert!(!in_range(89.999, (90.0, 150.0)));
        assert!(!in_range(150.001, (90.0, 150.0)));
    }
}
