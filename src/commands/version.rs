//! Command: print version information.

/// The version line printed by `stilyagi version`.
#[must_use]
pub fn run() -> String {
    format!("stilyagi {}", crate::version())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_the_binary() {
        assert_eq!(run(), format!("stilyagi {}", crate::version()));
    }
}
