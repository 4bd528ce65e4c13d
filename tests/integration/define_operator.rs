use opcat::catalog::{FunctionLookup, OperatorStore};
use opcat::commands::estimator::{JOIN_SIGNATURE, LEGACY_JOIN_SIGNATURE, RESTRICT_SIGNATURE};
use opcat::{
    AclObject, CatalogMetadata, InMemoryCatalog, NamespaceId, OperatorAttr, OperatorCommandOptions,
    OperatorCommands, Privilege, QualifiedName, Result, RoleId, TypeId, TypeName,
};

const SU: RoleId = RoleId::BOOTSTRAP_SUPERUSER;
const ALICE: RoleId = RoleId(1_000);

fn catalog() -> InMemoryCatalog {
    let mut catalog = InMemoryCatalog::new();
    let text = [TypeId::TEXT, TypeId::TEXT];
    catalog.create_function(NamespaceId::PUBLIC, "text_like", &text, TypeId::BOOL, SU);
    catalog.create_function(NamespaceId::PUBLIC, "text_cat", &text, TypeId::TEXT, SU);
    catalog.create_function(NamespaceId::PUBLIC, "int_abs", &[TypeId::INT4], TypeId::INT4, SU);
    catalog.create_function(NamespaceId::PUBLIC, "int_pos", &[TypeId::INT4], TypeId::BOOL, SU);
    catalog.create_function(NamespaceId::PUBLIC, "likesel", &RESTRICT_SIGNATURE, TypeId::FLOAT8, SU);
    catalog.create_function(NamespaceId::PUBLIC, "likejoinsel", &JOIN_SIGNATURE, TypeId::FLOAT8, SU);
    catalog
}

fn text_operands() -> Vec<OperatorAttr> {
    vec![
        OperatorAttr::new("left_type", "text"),
        OperatorAttr::new("right_type", "text"),
    ]
}

fn with(mut base: Vec<OperatorAttr>, extra: &[OperatorAttr]) -> Vec<OperatorAttr> {
    base.extend_from_slice(extra);
    base
}

#[test]
fn binary_boolean_operator_with_estimators() -> Result<()> {
    let mut catalog = catalog();
    let outcome = OperatorCommands::new(&mut catalog, ALICE).define(
        &"~~".into(),
        &with(
            text_operands(),
            &[
                OperatorAttr::new("function", "text_like"),
                OperatorAttr::new("restrict", "likesel"),
                OperatorAttr::new("join", "likejoinsel"),
                OperatorAttr::bare("hashes"),
                OperatorAttr::new("merges", "off"),
            ],
        ),
    )?;
    assert!(outcome.warnings.is_empty());

    let row = catalog.fetch_operator(outcome.oid)?.expect("row persisted");
    assert_eq!(row.name, "~~");
    assert_eq!(row.namespace, NamespaceId::PUBLIC);
    assert_eq!(row.result_type, Some(TypeId::BOOL));
    assert!(row.restrict.is_some() && row.join.is_some());
    assert!(row.can_hash);
    assert!(!row.can_merge);
    assert_eq!(row.owner, ALICE);
    Ok(())
}

#[test]
fn missing_operand_types() {
    let mut catalog = catalog();
    let mut commands = OperatorCommands::new(&mut catalog, ALICE);

    let err = commands
        .define(&"~~".into(), &[OperatorAttr::new("function", "text_like")])
        .unwrap_err();
    assert_eq!(err.code(), "InvalidDefinition");
    assert_eq!(err.to_string(), "operator argument types must be specified");

    let err = commands
        .define(
            &"~~".into(),
            &[
                OperatorAttr::new("left_type", "text"),
                OperatorAttr::new("function", "text_like"),
            ],
        )
        .unwrap_err();
    assert_eq!(err.to_string(), "operator right argument type must be specified");
    assert_eq!(err.detail(), Some("Postfix operators are not supported."));
}

#[test]
fn function_is_required() {
    let mut catalog = catalog();
    let err = OperatorCommands::new(&mut catalog, ALICE)
        .define(&"~~".into(), &text_operands())
        .unwrap_err();
    assert_eq!(err.to_string(), "operator function must be specified");
}

#[test]
fn function_lookup_arity_matches_operands() -> Result<()> {
    let mut catalog = catalog();
    {
        let mut commands = OperatorCommands::new(&mut catalog, ALICE);
        commands.define(
            &"@".into(),
            &[
                OperatorAttr::new("right_type", "int4"),
                OperatorAttr::new("function", "int_abs"),
            ],
        )?;
        commands.define(
            &"||".into(),
            &with(text_operands(), &[OperatorAttr::new("procedure", "text_cat")]),
        )?;
    }
    let lookups = catalog.function_lookups();
    assert_eq!(
        lookups,
        vec![
            FunctionLookup {
                name: QualifiedName::new("int_abs"),
                arity: 1
            },
            FunctionLookup {
                name: QualifiedName::new("text_cat"),
                arity: 2
            },
        ]
    );
    Ok(())
}

#[test]
fn unknown_function_signature_is_reported() {
    let mut catalog = catalog();
    let err = OperatorCommands::new(&mut catalog, ALICE)
        .define(
            &"~~".into(),
            &[
                OperatorAttr::new("left_type", "text"),
                OperatorAttr::new("right_type", "int4"),
                OperatorAttr::new("function", "text_like"),
            ],
        )
        .unwrap_err();
    assert_eq!(err.code(), "UndefinedFunction");
    assert_eq!(err.to_string(), "function text_like(text, integer) does not exist");
}

#[test]
fn unrecognized_attribute_only_warns() -> Result<()> {
    let mut catalog = catalog();
    let outcome = OperatorCommands::new(&mut catalog, ALICE).define(
        &"~~".into(),
        &with(
            text_operands(),
            &[
                OperatorAttr::new("function", "text_like"),
                OperatorAttr::new("foo", "bar"),
            ],
        ),
    )?;
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(
        outcome.warnings[0].to_string(),
        "operator attribute \"foo\" not recognized"
    );
    assert!(catalog.fetch_operator(outcome.oid)?.is_some());
    Ok(())
}

#[test]
fn legacy_sort_keys_set_merges() -> Result<()> {
    let mut catalog = catalog();
    let outcome = OperatorCommands::new(&mut catalog, ALICE).define(
        &"~~".into(),
        &with(
            text_operands(),
            &[
                OperatorAttr::new("function", "text_like"),
                OperatorAttr::new("sort1", "<"),
            ],
        ),
    )?;
    assert!(catalog.fetch_operator(outcome.oid)?.unwrap().can_merge);
    Ok(())
}

#[test]
fn non_boolean_hashes_argument_is_rejected() {
    let mut catalog = catalog();
    let err = OperatorCommands::new(&mut catalog, ALICE)
        .define(
            &"~~".into(),
            &with(
                text_operands(),
                &[
                    OperatorAttr::new("function", "text_like"),
                    OperatorAttr::new("hashes", "maybe"),
                ],
            ),
        )
        .unwrap_err();
    assert_eq!(err.code(), "InvalidDefinition");
    assert_eq!(err.to_string(), "hashes requires a Boolean value");
}

#[test]
fn setof_operand_is_rejected() {
    let mut catalog = catalog();
    let err = OperatorCommands::new(&mut catalog, ALICE)
        .define(
            &"~~".into(),
            &[
                OperatorAttr::new("left_type", TypeName::setof("text")),
                OperatorAttr::new("right_type", "text"),
                OperatorAttr::new("function", "text_like"),
            ],
        )
        .unwrap_err();
    assert_eq!(err.to_string(), "SETOF type not allowed for operator argument");
}

#[test]
fn invalid_symbol_is_rejected() {
    let mut catalog = catalog();
    let err = OperatorCommands::new(&mut catalog, ALICE)
        .define(
            &"like".into(),
            &with(text_operands(), &[OperatorAttr::new("function", "text_like")]),
        )
        .unwrap_err();
    assert_eq!(err.code(), "InvalidDefinition");
    assert_eq!(err.to_string(), "\"like\" is not a valid operator name");
}

#[test]
fn default_name_limit_admits_sixty_three_bytes() -> Result<()> {
    let mut catalog = catalog();
    let attrs = with(text_operands(), &[OperatorAttr::new("function", "text_like")]);
    let name = "~".repeat(63);
    OperatorCommands::new(&mut catalog, ALICE).define(&name.as_str().into(), &attrs)?;
    let err = OperatorCommands::new(&mut catalog, ALICE)
        .define(&"~".repeat(64).as_str().into(), &attrs)
        .unwrap_err();
    assert_eq!(err.code(), "InvalidDefinition");
    Ok(())
}

#[test]
fn shorter_name_limit_from_options() {
    let mut catalog = catalog();
    let options = OperatorCommandOptions {
        max_name_len: 2,
        ..OperatorCommandOptions::default()
    };
    let err = OperatorCommands::new(&mut catalog, ALICE)
        .with_options(options)
        .define(
            &"~~".into(),
            &with(text_operands(), &[OperatorAttr::new("function", "text_like")]),
        )
        .unwrap_err();
    assert_eq!(err.code(), "InvalidDefinition");
}

#[test]
fn create_privilege_on_schema_is_required() {
    let mut catalog = catalog();
    catalog.revoke(
        RoleId::PUBLIC,
        AclObject::Namespace(NamespaceId::PUBLIC),
        Privilege::Create,
    );
    let err = OperatorCommands::new(&mut catalog, ALICE)
        .define(
            &"~~".into(),
            &with(text_operands(), &[OperatorAttr::new("function", "text_like")]),
        )
        .unwrap_err();
    assert_eq!(err.code(), "PermissionDenied");
    assert_eq!(err.to_string(), "permission denied for schema public");
}

#[test]
fn execute_on_function_is_required() -> Result<()> {
    let mut catalog = catalog();
    let func = catalog
        .lookup_function(&"text_like".into(), &[TypeId::TEXT, TypeId::TEXT])?
        .expect("seeded");
    catalog.revoke(RoleId::PUBLIC, AclObject::Function(func), Privilege::Execute);
    let attrs = with(text_operands(), &[OperatorAttr::new("function", "text_like")]);

    let err = OperatorCommands::new(&mut catalog, ALICE)
        .define(&"~~".into(), &attrs)
        .unwrap_err();
    assert_eq!(err.code(), "PermissionDenied");
    assert_eq!(err.to_string(), "permission denied for function text_like");
    assert!(catalog.operators().is_empty());

    catalog.grant(ALICE, AclObject::Function(func), Privilege::Execute);
    OperatorCommands::new(&mut catalog, ALICE).define(&"~~".into(), &attrs)?;
    Ok(())
}

#[test]
fn join_estimator_signatures() -> Result<()> {
    let mut catalog = catalog();
    catalog.create_function(NamespaceId::PUBLIC, "oldjoinsel", &LEGACY_JOIN_SIGNATURE, TypeId::FLOAT8, SU);
    catalog.create_function(NamespaceId::PUBLIC, "bothjoinsel", &LEGACY_JOIN_SIGNATURE, TypeId::FLOAT8, SU);
    catalog.create_function(NamespaceId::PUBLIC, "bothjoinsel", &JOIN_SIGNATURE, TypeId::FLOAT8, SU);
    let attrs = |join: &str| {
        with(
            text_operands(),
            &[
                OperatorAttr::new("function", "text_like"),
                OperatorAttr::new("join", join),
            ],
        )
    };

    let outcome = OperatorCommands::new(&mut catalog, ALICE).define(&"~~".into(), &attrs("oldjoinsel"))?;
    let legacy = catalog.lookup_function(&"oldjoinsel".into(), &LEGACY_JOIN_SIGNATURE)?;
    assert_eq!(catalog.fetch_operator(outcome.oid)?.unwrap().join, legacy);

    let err = OperatorCommands::new(&mut catalog, ALICE)
        .define(&"~~*".into(), &attrs("bothjoinsel"))
        .unwrap_err();
    assert_eq!(err.code(), "AmbiguousFunction");

    let err = OperatorCommands::new(&mut catalog, ALICE)
        .define(&"~~*".into(), &attrs("nojoinsel"))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "function nojoinsel(internal, oid, internal, smallint, internal) does not exist"
    );

    let strict = OperatorCommandOptions {
        allow_legacy_join_signature: false,
        ..OperatorCommandOptions::default()
    };
    let err = OperatorCommands::new(&mut catalog, ALICE)
        .with_options(strict)
        .define(&"~~*".into(), &attrs("oldjoinsel"))
        .unwrap_err();
    assert_eq!(err.code(), "UndefinedFunction");
    Ok(())
}

#[test]
fn schema_qualified_definition() -> Result<()> {
    let mut catalog = catalog();
    let ops = catalog.create_schema("ops", ALICE);
    let outcome = OperatorCommands::new(&mut catalog, ALICE).define(
        &QualifiedName::parse("ops.~~"),
        &with(text_operands(), &[OperatorAttr::new("function", "public.text_like")]),
    )?;
    assert_eq!(catalog.fetch_operator(outcome.oid)?.unwrap().namespace, ops);

    let err = OperatorCommands::new(&mut catalog, ALICE)
        .define(
            &QualifiedName::parse("nowhere.~~"),
            &with(text_operands(), &[OperatorAttr::new("function", "text_like")]),
        )
        .unwrap_err();
    assert_eq!(err.to_string(), "schema \"nowhere\" does not exist");
    Ok(())
}

#[test]
fn duplicate_definition_rolls_back() -> Result<()> {
    let mut catalog = catalog();
    let attrs = with(text_operands(), &[OperatorAttr::new("function", "text_like")]);
    OperatorCommands::new(&mut catalog, ALICE).define(&"~~".into(), &attrs)?;
    let before = catalog.operators();

    let negated = with(attrs.clone(), &[OperatorAttr::new("negator", "!~~")]);
    let err = catalog
        .atomically(|c| OperatorCommands::new(c, ALICE).define(&"~~".into(), &negated))
        .unwrap_err();
    assert_eq!(err.code(), "DuplicateObject");
    assert_eq!(err.to_string(), "operator ~~(text, text) already exists");
    assert_eq!(catalog.operators(), before);
    assert!(catalog
        .lookup_operator(&"!~~".into(), Some(TypeId::TEXT), Some(TypeId::TEXT))?
        .is_none());
    Ok(())
}

#[test]
fn shell_created_before_a_failure_is_rolled_back() -> Result<()> {
    let mut catalog = catalog();
    catalog.create_schema("locked", SU);
    let attrs = with(
        text_operands(),
        &[
            OperatorAttr::new("function", "text_like"),
            OperatorAttr::new("negator", "!~~"),
            OperatorAttr::new("commutator", "locked.~~"),
        ],
    );

    let err = catalog
        .atomically(|c| OperatorCommands::new(c, ALICE).define(&"~~".into(), &attrs))
        .unwrap_err();
    assert_eq!(err.code(), "PermissionDenied");
    assert_eq!(err.to_string(), "permission denied for schema locked");
    assert!(catalog.operators().is_empty());
    assert!(catalog
        .lookup_operator(&"!~~".into(), Some(TypeId::TEXT), Some(TypeId::TEXT))?
        .is_none());
    Ok(())
}

#[test]
fn only_the_shell_owner_may_fill_it() -> Result<()> {
    const BOB: RoleId = RoleId(1_001);
    let mut catalog = catalog();
    let like = with(
        text_operands(),
        &[
            OperatorAttr::new("function", "text_like"),
            OperatorAttr::new("commutator", "~~*"),
        ],
    );
    OperatorCommands::new(&mut catalog, ALICE).define(&"~~".into(), &like)?;

    let fill = with(text_operands(), &[OperatorAttr::new("function", "text_like")]);
    let err = catalog
        .atomically(|c| OperatorCommands::new(c, BOB).define(&"~~*".into(), &fill))
        .unwrap_err();
    assert_eq!(err.code(), "PermissionDenied");
    assert_eq!(err.to_string(), "must be owner of operator ~~*");

    let oid = OperatorCommands::new(&mut catalog, ALICE)
        .define(&"~~*".into(), &fill)?
        .oid;
    let row = catalog.fetch_operator(oid)?.unwrap();
    assert_eq!(row.owner, ALICE);
    assert!(row.function.is_some());
    Ok(())
}
