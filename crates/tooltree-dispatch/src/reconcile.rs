//! Turning parsed arguments into handler arguments.
//!
//! Parsing yields a flat map that may include standard or common arguments
//! the handler never declared. Reconciliation builds exactly the set the
//! handler expects:
//!
//! - each declared, non-internal argument under its destination name,
//!   defaulted when absent and optional
//! - internal arguments the handler declared, when present
//! - the `cd` tempfile, only for commands marked `cd`
//! - every declared extra-data key, resolved through the config

use std::collections::HashMap;
use std::rc::Rc;

use crate::config::CD_ARG_DEST;
use crate::context::ParseContext;
use crate::error::{CliError, MissingArgumentError, UnknownExtraDataError};
use crate::extra::CONTEXT_KEY;
use crate::handler::{ExtraValue, FunctionArgs};
use crate::parser::ParsedArgs;
use crate::spec::normalize_name;

/// Builds the handler's arguments from parsed values and the context.
pub fn reconcile(parsed: &ParsedArgs, ctx: &Rc<ParseContext>) -> Result<FunctionArgs, CliError> {
    let spec = &ctx.command_spec;
    let mut args = FunctionArgs::new();

    for arg in &spec.args {
        let dest = arg.destination();
        let raw_name = normalize_name(arg.primary_name());
        let found = parsed.get(&raw_name).or_else(|| parsed.get(&dest)).cloned();

        if arg.internal {
            if let Some(value) = found {
                args.insert_value(dest, value);
            }
            continue;
        }

        match found {
            Some(value) => args.insert_value(dest, value),
            None if arg.is_optional() => args.insert_value(dest, arg.implicit_default()),
            None => return Err(MissingArgumentError { name: dest }.into()),
        }
    }

    if spec.special.cd {
        if let Some(tempfile) = parsed.get(CD_ARG_DEST) {
            args.insert_value(CD_ARG_DEST, tempfile.clone());
        }
    }

    let config = &ctx.config;
    let mut computed: HashMap<&str, ExtraValue> = HashMap::new();
    for key in &spec.extra_data {
        if key == CONTEXT_KEY {
            args.set_context(ctx.clone());
        } else if let Some(value) = config.extra_data.get(key) {
            args.insert_extra(key.clone(), value.clone());
        } else if let Some(getter) = config.extra_data_getters.get(key) {
            let value = match computed.get(key.as_str()) {
                Some(value) => value.clone(),
                None => {
                    let value = getter.call(key)?;
                    computed.insert(key.as_str(), value.clone());
                    value
                }
            };
            args.insert_extra(key.clone(), value);
        } else {
            return Err(UnknownExtraDataError { key: key.clone() }.into());
        }
    }

    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliConfig;
    use crate::extra::ExtraDataGetter;
    use crate::handler::Handler;
    use crate::spec::{ArgSpec, CommandSpec, Nargs};
    use serde_json::json;
    use std::cell::Cell;

    fn ctx(spec: CommandSpec, config: CliConfig) -> Rc<ParseContext> {
        Rc::new(ParseContext::new(
            Vec::new(),
            None,
            None,
            spec,
            Rc::new(config),
        ))
    }

    fn noop() -> Handler {
        Handler::from_fn(|_| Ok(()))
    }

    #[test]
    fn test_only_declared_args_are_passed() {
        let spec = CommandSpec::new(noop()).arg(ArgSpec::new("--name"));
        let mut parsed = ParsedArgs::new();
        parsed.insert("name".into(), json!("x"));
        parsed.insert("debug".into(), json!(true));

        let args = reconcile(&parsed, &ctx(spec, CliConfig::default())).unwrap();
        assert_eq!(args.values().len(), 1);
        assert_eq!(args.str("name"), Some("x"));
    }

    #[test]
    fn test_renamed_destination() {
        let spec = CommandSpec::new(noop()).arg(ArgSpec::new("--from").dest("source"));
        let mut parsed = ParsedArgs::new();
        parsed.insert("source".into(), json!("a"));

        let args = reconcile(&parsed, &ctx(spec, CliConfig::default())).unwrap();
        assert_eq!(args.str("source"), Some("a"));
    }

    #[test]
    fn test_defaults_for_absent_optional_args() {
        let spec = CommandSpec::new(noop())
            .arg(ArgSpec::new("--yes").store_true())
            .arg(ArgSpec::new("--no-cache").store_false())
            .arg(ArgSpec::new("-v").count())
            .arg(ArgSpec::new("items").nargs(Nargs::ZeroOrMore))
            .arg(ArgSpec::new("--limit").default(10))
            .arg(ArgSpec::new("--name"));

        let args = reconcile(&ParsedArgs::new(), &ctx(spec, CliConfig::default())).unwrap();
        assert_eq!(args.value("yes"), Some(&json!(false)));
        assert_eq!(args.value("no_cache"), Some(&json!(true)));
        assert_eq!(args.value("v"), Some(&json!(0)));
        assert_eq!(args.value("items"), Some(&json!([])));
        assert_eq!(args.value("limit"), Some(&json!(10)));
        assert_eq!(args.value("name"), Some(&json!(null)));
    }

    #[test]
    fn test_missing_required_positional() {
        let spec = CommandSpec::new(noop()).arg(ArgSpec::new("path"));
        let err = reconcile(&ParsedArgs::new(), &ctx(spec, CliConfig::default())).unwrap_err();
        assert!(matches!(err, CliError::MissingArgument(ref e) if e.name == "path"));
    }

    #[test]
    fn test_cd_tempfile_only_for_cd_commands() {
        let mut parsed = ParsedArgs::new();
        parsed.insert(CD_ARG_DEST.into(), json!("/tmp/t"));

        let plain = reconcile(&parsed, &ctx(CommandSpec::new(noop()), CliConfig::default())).unwrap();
        assert!(!plain.contains(CD_ARG_DEST));

        let cd = reconcile(
            &parsed,
            &ctx(CommandSpec::new(noop()).cd(), CliConfig::default()),
        )
        .unwrap();
        assert_eq!(cd.str(CD_ARG_DEST), Some("/tmp/t"));
    }

    #[test]
    fn test_context_injection() {
        let spec = CommandSpec::new(noop()).extra_data(CONTEXT_KEY);
        let context = ctx(spec, CliConfig::default());
        let args = reconcile(&ParsedArgs::new(), &context).unwrap();
        assert!(Rc::ptr_eq(args.context().unwrap(), &context));
    }

    #[test]
    fn test_static_and_getter_extra_data() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let config = CliConfig::builder()
            .extra_data("token", String::from("secret"))
            .extra_data_getter(
                "db",
                ExtraDataGetter::from_fn(move |_| {
                    counter.set(counter.get() + 1);
                    Ok(7u32)
                }),
            )
            .build();
        let spec = CommandSpec::new(noop())
            .extra_data("token")
            .extra_data("db")
            .extra_data("db");

        let args = reconcile(&ParsedArgs::new(), &ctx(spec, config)).unwrap();
        assert_eq!(args.extra::<String>("token").unwrap(), "secret");
        assert_eq!(*args.extra::<u32>("db").unwrap(), 7);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_unknown_extra_data() {
        let spec = CommandSpec::new(noop()).extra_data("nope");
        let err = reconcile(&ParsedArgs::new(), &ctx(spec, CliConfig::default())).unwrap_err();
        assert!(matches!(err, CliError::UnknownExtraData(ref e) if e.key == "nope"));
    }

    #[test]
    fn test_internal_args_pass_through_when_present() {
        let spec = CommandSpec::new(noop()).arg(ArgSpec::new("--secret").internal());
        let empty = reconcile(&ParsedArgs::new(), &ctx(spec.clone(), CliConfig::default())).unwrap();
        assert!(!empty.contains("secret"));

        let mut parsed = ParsedArgs::new();
        parsed.insert("secret".into(), json!("s"));
        let args = reconcile(&parsed, &ctx(spec, CliConfig::default())).unwrap();
        assert_eq!(args.str("secret"), Some("s"));
    }
}
