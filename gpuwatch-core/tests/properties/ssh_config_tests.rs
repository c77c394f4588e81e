//! Property tests for ssh config pattern matching and resolution

use gpuwatch_core::ssh_config::{HostPattern, SshConfigFile};
use proptest::prelude::*;

proptest! {
    /// Property: a literal pattern matches exactly itself
    #[test]
    fn literal_pattern_matches_itself(alias in "[a-z0-9.-]{1,20}", other in "[a-z0-9.-]{1,20}") {
        let pattern = HostPattern::new(&alias);
        prop_assert!(pattern.matches(&alias));
        prop_assert_eq!(pattern.matches(&other), alias == other);
    }

    /// Property: `*` matches every alias, `prefix*` every alias with that prefix
    #[test]
    fn star_patterns(prefix in "[a-z]{1,6}", suffix in "[a-z0-9-]{0,10}") {
        let alias = format!("{prefix}{suffix}");
        prop_assert!(HostPattern::new("*").matches(&alias));
        let pattern = format!("{prefix}*");
        prop_assert!(HostPattern::new(&pattern).matches(&alias));
    }

    /// Property: the parser never panics on arbitrary input
    #[test]
    fn parse_never_panics(input in "(?s).{0,300}") {
        let _ = SshConfigFile::parse(&input);
    }

    /// Property: an alias absent from the file resolves to itself on port 22
    #[test]
    fn unmatched_alias_defaults(alias in "[a-z]{1,12}") {
        let config = SshConfigFile::parse("Host 0-never-matches\n  Port 1\n").unwrap();
        let params = config.resolve(&alias);
        prop_assert_eq!(params.hostname, alias);
        prop_assert_eq!(params.port, 22);
    }
}
