//! End-to-end runs of the dispatch pipeline.

use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;
use tooltree_dispatch::{
    add_plugin, execute_other_command_sequence, run, ArgSpec, CliConfig, CliError, CommandIndex,
    CommandRef, CommandSequence, CommandSpec, ExtraDataGetter, Handler, Invocation, Middleware,
    ModuleRegistry, Nargs, ParseMode, Plugin, CONTEXT_KEY,
};

type Calls = Rc<RefCell<Vec<(String, Value)>>>;

/// A handler recording its name and all plain values.
fn recording(name: &str, calls: &Calls) -> Handler {
    let name = name.to_string();
    let calls = calls.clone();
    Handler::from_fn(move |args| {
        calls
            .borrow_mut()
            .push((name.clone(), Value::Object(args.values().clone())));
        Ok(())
    })
}

fn invoke(index: CommandIndex, config: CliConfig, line: &str) -> Result<(), CliError> {
    run(Invocation::new(Rc::new(config))
        .raw(line)
        .index(Rc::new(index)))
}

#[test]
fn test_longest_sequence_handler_runs_with_remaining_args() {
    let calls: Calls = Rc::default();
    let mut index = CommandIndex::new();
    index.insert(
        ["a"],
        CommandSpec::new(recording("a", &calls)).arg(ArgSpec::new("rest").nargs(Nargs::ZeroOrMore)),
    );
    index.insert(
        ["a", "b"],
        CommandSpec::new(recording("a b", &calls)).arg(ArgSpec::new("c")),
    );
    index.insert(
        CommandSequence::root(),
        CommandSpec::new(recording("root", &calls)),
    );

    invoke(index, CliConfig::default(), "a b c").unwrap();

    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "a b");
    assert_eq!(calls[0].1, json!({"c": "c"}));
}

#[test]
fn test_unsorted_index_prefers_registration_order() {
    let calls: Calls = Rc::default();
    let mut index = CommandIndex::new();
    index.insert(
        ["a"],
        CommandSpec::new(recording("a", &calls)).arg(ArgSpec::new("rest").nargs(Nargs::ZeroOrMore)),
    );
    index.insert(["a", "b"], CommandSpec::new(recording("a b", &calls)));

    let config = CliConfig::builder().sort_command_index(false).build();
    invoke(index, config, "a b").unwrap();

    assert_eq!(calls.borrow()[0].0, "a");
    assert_eq!(calls.borrow()[0].1, json!({"rest": ["b"]}));
}

#[test]
fn test_default_sequence_used_when_nothing_matches() {
    let calls: Calls = Rc::default();
    let mut index = CommandIndex::new();
    index.insert(
        ["list"],
        CommandSpec::new(recording("list", &calls)).arg(ArgSpec::new("--all").store_true()),
    );
    let config = CliConfig::builder().default_command_sequence(["list"]).build();

    invoke(index, config, "--all").unwrap();
    assert_eq!(calls.borrow()[0].1, json!({"all": true}));
}

#[test]
fn test_no_match_error_lists_candidates() {
    let mut index = CommandIndex::new();
    index.insert(["list"], CommandSpec::new(Handler::from_fn(|_| Ok(()))));

    let err = invoke(index, CliConfig::default(), "remove x").unwrap_err();
    assert_eq!(err.message().as_deref(), Some("unknown command: remove x (available: list)"));
}

#[test]
fn test_module_path_resolved_lazily() {
    let calls: Calls = Rc::default();
    let resolved = Rc::new(RefCell::new(Vec::new()));

    let mut modules = ModuleRegistry::new();
    for name in ["used", "unused"] {
        let calls = calls.clone();
        let resolved = resolved.clone();
        modules.register_factory(format!("app.{}", name), move || {
            resolved.borrow_mut().push(name);
            Ok(CommandSpec::new(recording(name, &calls)))
        });
    }
    let mut index = CommandIndex::new();
    index.insert(["used"], CommandRef::path("app.used"));
    index.insert(["unused"], CommandRef::path("app.unused"));

    let config = CliConfig::builder().modules(modules).build();
    invoke(index, config, "used").unwrap();

    assert_eq!(*resolved.borrow(), vec!["used"]);
    assert_eq!(calls.borrow()[0].0, "used");
}

#[test]
fn test_unresolvable_reference_fails() {
    let mut index = CommandIndex::new();
    index.insert(["x"], CommandRef::path("app.missing"));
    let err = invoke(index, CliConfig::default(), "x").unwrap_err();
    assert!(matches!(err, CliError::Resolution(_)));
}

#[test]
fn test_common_args_are_parsed_but_not_passed() {
    let calls: Calls = Rc::default();
    let seen = Rc::new(RefCell::new(Value::Null));
    let sink = seen.clone();

    let mut index = CommandIndex::new();
    index.insert(["run"], CommandSpec::new(recording("run", &calls)));
    let config = CliConfig::builder()
        .common_arg(ArgSpec::new("--profile").default("dev"))
        .pre_middleware(Middleware::from_fn(move |_, args| {
            *sink.borrow_mut() = args["profile"].clone();
            Ok(())
        }))
        .build();

    invoke(index, config, "run --profile prod").unwrap();
    assert_eq!(*seen.borrow(), json!("prod"));
    assert_eq!(calls.borrow()[0].1, json!({}));
}

#[test]
fn test_extra_data_and_context_injection() {
    let seen = Rc::new(RefCell::new(None));
    let sink = seen.clone();
    let handler = Handler::from_fn(move |args| {
        let ctx = args.context()?;
        let client = args.extra::<String>("client")?;
        *sink.borrow_mut() = Some(format!("{} via {}", ctx.sequence_text(), client));
        Ok(())
    });

    let mut index = CommandIndex::new();
    index.insert(
        ["sync", "now"],
        CommandSpec::new(handler)
            .extra_data(CONTEXT_KEY)
            .extra_data("client"),
    );
    let config = CliConfig::builder()
        .extra_data_getter(
            "client",
            ExtraDataGetter::from_async_fn(|inputs| async move {
                let host = inputs.kwargs["host"].as_str().unwrap_or("?").to_string();
                Ok::<_, anyhow::Error>(format!("client({})", host))
            })
            .kwarg("host", "example.org"),
        )
        .build();

    invoke(index, config, "sync now").unwrap();
    assert_eq!(
        seen.borrow().as_deref(),
        Some("sync now via client(example.org)")
    );
}

#[test]
fn test_known_mode_ignores_unknown_tokens() {
    let calls: Calls = Rc::default();
    let mut index = CommandIndex::new();
    index.insert(
        ["show"],
        CommandSpec::new(recording("show", &calls)).arg(ArgSpec::new("--limit").int().default(5)),
    );
    let config = CliConfig::builder().parse_mode(ParseMode::Known).build();

    invoke(index, config, "show --colour=always --limit 2").unwrap();
    assert_eq!(calls.borrow()[0].1, json!({"limit": 2}));
}

#[test]
fn test_parse_error_is_single_line() {
    let mut index = CommandIndex::new();
    index.insert(
        ["show"],
        CommandSpec::new(Handler::from_fn(|_| Ok(()))).arg(ArgSpec::new("--limit").int()),
    );
    let err = invoke(index, CliConfig::default(), "show --limit lots").unwrap_err();
    let message = err.message().unwrap();
    assert!(message.contains("--limit"), "{}", message);
    assert_eq!(message, err.to_string());
}

#[test]
fn test_help_flag_runs_help_command_for_matched_sequence() {
    let calls: Calls = Rc::default();
    let mut index = CommandIndex::new();
    index.insert(
        ["help"],
        CommandSpec::new(recording("help", &calls))
            .arg(ArgSpec::new("subcommand").nargs(Nargs::ZeroOrMore)),
    );
    index.insert(
        ["db", "migrate"],
        CommandSpec::new(recording("migrate", &calls)).arg(ArgSpec::new("target")),
    );
    let config = CliConfig::builder().include_help_arg(true).build();

    invoke(index, config, "db migrate --help").unwrap();

    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "help");
    assert_eq!(calls[0].1, json!({"subcommand": ["db", "migrate"]}));
}

#[test]
fn test_nested_invocation_from_handler() {
    let calls: Calls = Rc::default();
    let mut index = CommandIndex::new();
    index.insert(["inner"], CommandSpec::new(recording("inner", &calls)));
    index.insert(
        ["outer"],
        CommandSpec::new(Handler::from_fn(|args| {
            let ctx = args.context()?;
            execute_other_command_sequence(ctx, ["inner"], None)?;
            Ok(())
        }))
        .extra_data(CONTEXT_KEY),
    );

    invoke(index, CliConfig::default(), "outer").unwrap();
    assert_eq!(calls.borrow()[0].0, "inner");
}

#[test]
fn test_aliases_route_to_target() {
    let calls: Calls = Rc::default();
    let index: CommandIndex = [(
        ["config", "get"],
        CommandSpec::new(recording("get", &calls)).arg(ArgSpec::new("key")),
    )]
    .into_iter()
    .collect();
    let config = CliConfig::builder().command_sequence_alias(["c"], ["config"]).build();
    let index = index.with_aliases(&config.command_sequence_aliases);

    invoke(index, config, "c get name").unwrap();
    assert_eq!(calls.borrow()[0].1, json!({"key": "name"}));
}

#[test]
fn test_plugin_commands_are_dispatched() {
    let calls: Calls = Rc::default();
    let plugin_index: CommandIndex = [(["plug"], CommandSpec::new(recording("plug", &calls)))]
        .into_iter()
        .collect();
    let mut index = CommandIndex::new();
    let mut builder = CliConfig::builder();
    add_plugin(&mut index, &mut builder, Plugin::new(plugin_index)).unwrap();

    invoke(index, builder.build(), "plug").unwrap();
    assert_eq!(calls.borrow()[0].0, "plug");
}

#[test]
fn test_help_flag_wins_over_missing_required_args() {
    let calls: Calls = Rc::default();
    let mut index = CommandIndex::new();
    index.insert(
        ["help"],
        CommandSpec::new(recording("help", &calls))
            .arg(ArgSpec::new("subcommand").nargs(Nargs::ZeroOrMore)),
    );
    index.insert(
        ["deploy"],
        CommandSpec::new(recording("deploy", &calls))
            .arg(ArgSpec::new("target"))
            .arg(ArgSpec::new("--region").required(true)),
    );
    let config = CliConfig::builder().include_help_arg(true).build();

    invoke(index, config, "deploy -h").unwrap();
    assert_eq!(calls.borrow()[0].1, json!({"subcommand": ["deploy"]}));
}

#[test]
fn test_getter_runs_once_per_declaring_invocation() {
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();
    let config = Rc::new(
        CliConfig::builder()
            .extra_data_getter(
                "db",
                ExtraDataGetter::from_fn(move |_| {
                    *counter.borrow_mut() += 1;
                    Ok(String::from("conn"))
                }),
            )
            .build(),
    );
    let mut index = CommandIndex::new();
    index.insert(
        ["query"],
        CommandSpec::new(Handler::from_fn(|_| Ok(()))).extra_data("db"),
    );
    index.insert(["ping"], CommandSpec::new(Handler::from_fn(|_| Ok(()))));
    let index = Rc::new(index);

    let invoke = |line: &str| {
        run(Invocation::new(config.clone())
            .raw(line)
            .index(index.clone()))
    };
    invoke("ping").unwrap();
    assert_eq!(*calls.borrow(), 0);
    invoke("query").unwrap();
    invoke("query").unwrap();
    assert_eq!(*calls.borrow(), 2);
}

#[test]
fn test_sync_and_async_handlers_see_same_args() {
    let calls: Calls = Rc::default();
    let async_calls = calls.clone();
    let args = || {
        vec![
            ArgSpec::new("name"),
            ArgSpec::new("--times").int().default(1),
            ArgSpec::new("--loud").store_true(),
        ]
    };
    let mut index = CommandIndex::new();
    index.insert(["greet"], CommandSpec::new(recording("greet", &calls)).args(args()));
    index.insert(
        ["greet-async"],
        CommandSpec::new(Handler::from_async_fn(move |args| {
            let calls = async_calls.clone();
            async move {
                tokio::task::yield_now().await;
                calls
                    .borrow_mut()
                    .push(("greet".to_string(), Value::Object(args.values().clone())));
                Ok(())
            }
        }))
        .args(args()),
    );
    let index = Rc::new(index);
    let config = Rc::new(CliConfig::default());

    for line in ["greet ada --times 3", "greet-async ada --times 3"] {
        run(Invocation::new(config.clone())
            .raw(line)
            .index(index.clone()))
        .unwrap();
    }

    let calls = calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], calls[1]);
    assert_eq!(calls[0].1, json!({"name": "ada", "times": 3, "loud": false}));
}
