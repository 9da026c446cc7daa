use modgraph_core::module::{ExcludeRule, ModuleId, ModuleVersionId};

#[test]
fn test_module_id_parse() {
    let id = ModuleId::parse("org.example:lib").unwrap();
    assert_eq!(id.group, "org.example");
    assert_eq!(id.name, "lib");
    assert_eq!(id.to_string(), "org.example:lib");
}

#[test]
fn test_module_id_parse_rejects_bad_input() {
    assert!(ModuleId::parse("lib").is_none());
    assert!(ModuleId::parse(":lib").is_none());
    assert!(ModuleId::parse("a:b:c").is_none());
}

#[test]
fn test_module_version_id_parse() {
    let id = ModuleVersionId::parse("org:foo:1.0").unwrap();
    assert_eq!(id.module(), ModuleId::new("org", "foo"));
    assert_eq!(id.version, "1.0");
    assert_eq!(id.to_string(), "org:foo:1.0");
    assert!(ModuleVersionId::parse("org:foo").is_none());
    assert!(ModuleVersionId::parse("org:foo:").is_none());
}

#[test]
fn test_with_version() {
    let id = ModuleId::new("org", "foo").with_version("2.0");
    assert_eq!(id, ModuleVersionId::new("org", "foo", "2.0"));
}

#[test]
fn test_exclude_rule_parse_forms() {
    let both = ExcludeRule::parse("org:foo").unwrap();
    assert_eq!(both.group.as_deref(), Some("org"));
    assert_eq!(both.module.as_deref(), Some("foo"));

    let group_only = ExcludeRule::parse("org").unwrap();
    assert_eq!(group_only.module, None);

    let all = ExcludeRule::parse("*:*").unwrap();
    assert_eq!(all, ExcludeRule::all());
    assert_eq!(all.to_string(), "*:*");

    assert!(ExcludeRule::parse("").is_none());
    assert!(ExcludeRule::parse("org:").is_none());
}

#[test]
fn test_exclude_rule_matching() {
    let foo = ModuleId::new("org", "foo");
    let bar = ModuleId::new("com", "bar");
    assert!(ExcludeRule::all().matches(&foo));
    assert!(ExcludeRule::parse("org").unwrap().matches(&foo));
    assert!(!ExcludeRule::parse("org").unwrap().matches(&bar));
    assert!(ExcludeRule::parse("*:bar").unwrap().matches(&bar));
    assert!(!ExcludeRule::parse("org:bar").unwrap().matches(&foo));
}
