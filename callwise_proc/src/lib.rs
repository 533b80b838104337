//SPDX-License-Identifier: MIT OR Apache-2.0

//! # Callwise Procedural Macros
//!
//! This crate provides the `#[log_call]` attribute for the callwise tracing
//! library. The attribute rewrites the body of a function so that every
//! invocation runs through `callwise::hidden::invoke`, which emits the paired
//! entered/exited records around the original body.
//!
//! ## What the expansion looks like
//!
//! ```ignore
//! #[log_call(logger_name = "my.logger", level = warning)]
//! fn add(a: u32, b: u32) -> u32 {
//!     a + b
//! }
//!
//! // Expands to approximately:
//! #[track_caller]
//! fn add(a: u32, b: u32) -> u32 {
//!     let __callwise_rendered_args =
//!         ::std::vec![callwise::render_value!(a), callwise::render_value!(b)];
//!     callwise::hidden::invoke(
//!         concat!(module_path!(), "::", "add"),
//!         callwise::hidden::call_config("my.logger", callwise::Level::Warning),
//!         ::std::panic::Location::caller(),
//!         __callwise_rendered_args,
//!         |__callwise_returned| callwise::render_value!(*__callwise_returned),
//!         move || { a + b },
//!     )
//! }
//! ```
//!
//! The original body is spliced in as its original token group, so spans
//! inside it survive the rewrite. `#[track_caller]` is added so the records
//! are attributed to the function's immediate caller rather than to any
//! generated code.
//!
//! ## Configuration
//!
//! Both keys are optional:
//! - `logger_name = "…"` — a non-empty string literal; defaults to
//!   `"callwise"`.
//! - `level = …` — one of `debug`, `info`, `warning`, `error`, `critical`
//!   (case-insensitive); defaults to `debug`.
//!
//! Invalid configuration is rejected here, at expansion time, never at the
//! first call.

use proc_macro::{Delimiter, Group, TokenStream, TokenTree};
use std::collections::VecDeque;

/// Parses a key from the token stream, consuming tokens until '=' is
/// encountered.
fn parse_key(input: &mut VecDeque<TokenTree>) -> Option<String> {
    //basically we go until we get a =.
    let mut key = String::new();
    loop {
        match input.pop_front() {
            Some(TokenTree::Punct(p)) => {
                if p.as_char() == '=' {
                    return Some(key);
                }
                return Some("".to_string());
            }
            Some(TokenTree::Ident(i)) => {
                key.push_str(&i.to_string());
            }
            Some(TokenTree::Literal(l)) => {
                key.push_str(&l.to_string());
            }
            Some(TokenTree::Group(g)) => {
                key.push_str(&g.to_string());
            }
            None => {
                return None;
            }
        }
    }
}

/// Parses a value from the token stream, consuming tokens until ',' or end of
/// stream.
fn parse_value(input: &mut VecDeque<TokenTree>) -> String {
    //basically we go until we get a , or end.
    let mut value = String::new();
    loop {
        match input.pop_front() {
            Some(TokenTree::Punct(p)) => {
                if p.as_char() == ',' {
                    return value;
                }
                value.push_str(&p.to_string());
            }
            Some(TokenTree::Ident(i)) => {
                value.push_str(&i.to_string());
            }
            Some(TokenTree::Literal(l)) => {
                value.push_str(&l.to_string());
            }
            Some(TokenTree::Group(g)) => {
                value.push_str(&g.to_string());
            }
            None => {
                return value;
            }
        }
    }
}

/// The wrap-site configuration extracted from the attribute arguments.
struct WrapConfig {
    /// Logger name as a string-literal token, quotes included.
    logger_name: String,
    /// Full path to the `callwise::Level` variant.
    level_path: String,
}

impl Default for WrapConfig {
    fn default() -> Self {
        Self {
            logger_name: r#""callwise""#.to_string(),
            level_path: "callwise::Level::Debug".to_string(),
        }
    }
}

fn parse_attr_config(attr: TokenStream) -> Result<WrapConfig, TokenStream> {
    let mut config = WrapConfig::default();
    let mut input: VecDeque<TokenTree> = attr.into_iter().collect();
    loop {
        let key = match parse_key(&mut input) {
            Some(k) => k,
            None => return Ok(config),
        };
        let value = parse_value(&mut input);
        match key.as_str() {
            "logger_name" => {
                if !value.starts_with('"') || !value.ends_with('"') {
                    return Err(
                        r#"compile_error!("logger_name must be a string literal")"#
                            .parse()
                            .unwrap(),
                    );
                }
                if value.len() <= 2 {
                    return Err(
                        r#"compile_error!("logger_name must not be empty")"#
                            .parse()
                            .unwrap(),
                    );
                }
                config.logger_name = value;
            }
            "level" => {
                config.level_path = match value.to_lowercase().as_str() {
                    "debug" => "callwise::Level::Debug".to_string(),
                    "info" => "callwise::Level::Info".to_string(),
                    "warning" => "callwise::Level::Warning".to_string(),
                    "error" => "callwise::Level::Error".to_string(),
                    "critical" => "callwise::Level::Critical".to_string(),
                    _ => {
                        return Err(format!(
                            r#"compile_error!("unknown level `{}`; expected debug, info, warning, error, or critical")"#,
                            value
                        )
                        .parse()
                        .unwrap());
                    }
                };
            }
            other => {
                return Err(format!(
                    r#"compile_error!("unknown log_call option `{}`; expected logger_name or level")"#,
                    other
                )
                .parse()
                .unwrap());
            }
        }
    }
}

/// Splits a parameter-list token stream at top-level commas, tracking
/// angle-bracket depth so generic arguments like `HashMap<K, V>` stay intact.
fn split_params(params: &Group) -> Vec<Vec<TokenTree>> {
    let mut segments: Vec<Vec<TokenTree>> = Vec::new();
    let mut current: Vec<TokenTree> = Vec::new();
    let mut angle_depth = 0i32;
    let mut prev_char: Option<char> = None;
    for token in params.stream() {
        let mut this_char = None;
        if let TokenTree::Punct(p) = &token {
            this_char = Some(p.as_char());
            match p.as_char() {
                '<' => angle_depth += 1,
                // `->` in an `fn(..) -> ..` parameter type is not a closing bracket
                '>' if prev_char != Some('-') => angle_depth -= 1,
                ',' if angle_depth == 0 => {
                    segments.push(std::mem::take(&mut current));
                    prev_char = Some(',');
                    continue;
                }
                _ => {}
            }
        }
        prev_char = this_char;
        current.push(token);
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Produces the render expression for one parameter.
///
/// `self` in any form renders the receiver; a plain (possibly `mut`/`ref`)
/// identifier renders that binding; anything else (tuple patterns, `_`) has
/// no name to reference and renders as a placeholder.
fn param_render_expr(segment: &[TokenTree]) -> String {
    // the pattern is everything before the first top-level ':' that isn't '::'
    let mut pattern: Vec<&TokenTree> = Vec::new();
    let mut tokens = segment.iter().peekable();
    while let Some(token) = tokens.next() {
        if let TokenTree::Punct(p) = token {
            if p.as_char() == ':' {
                let double_colon = p.spacing() == proc_macro::Spacing::Joint
                    && matches!(tokens.peek(), Some(TokenTree::Punct(next)) if next.as_char() == ':');
                if !double_colon {
                    break;
                }
            }
        }
        pattern.push(token);
    }

    let idents: Vec<String> = pattern
        .iter()
        .filter_map(|token| match token {
            TokenTree::Ident(i) => Some(i.to_string()),
            _ => None,
        })
        .filter(|name| name != "mut" && name != "ref")
        .collect();

    if idents.iter().any(|name| name == "self") {
        return "callwise::render_value!(self)".to_string();
    }
    let only_idents = pattern
        .iter()
        .all(|token| matches!(token, TokenTree::Ident(_)));
    match idents.as_slice() {
        [name] if only_idents && name != "_" => {
            format!("callwise::render_value!({})", name)
        }
        _ => r#"::std::string::String::from("_")"#.to_string(),
    }
}

/// Extracts the declared return type from the tokens between a function's
/// parameter list and its body.
///
/// Returns a type expression suitable for a `&(..)` annotation. An elided
/// return renders as the unit type `()`. A trailing `where` clause (which is
/// not part of the type) is dropped. Angle-bracket depth is tracked so a
/// `where` inside a generic argument is not mistaken for the clause keyword.
fn extract_return_type(between: &[TokenTree]) -> String {
    let mut tokens = between.iter().peekable();

    // Strip the leading `->`, if present; no arrow means an elided `()` return.
    match tokens.peek() {
        Some(TokenTree::Punct(p)) if p.as_char() == '-' => {
            tokens.next();
            if matches!(tokens.peek(), Some(TokenTree::Punct(p)) if p.as_char() == '>') {
                tokens.next();
            }
        }
        _ => return "()".to_string(),
    }

    let mut collected = TokenStream::new();
    let mut angle_depth = 0i32;
    let mut prev_char: Option<char> = None;
    for token in tokens {
        match token {
            TokenTree::Ident(i) if angle_depth == 0 && i.to_string() == "where" => break,
            TokenTree::Punct(p) => {
                match p.as_char() {
                    '<' => angle_depth += 1,
                    '>' if prev_char != Some('-') => angle_depth -= 1,
                    _ => {}
                }
                prev_char = Some(p.as_char());
            }
            _ => prev_char = None,
        }
        collected.extend(std::iter::once(token.clone()));
    }

    let rendered = collected.to_string();
    if rendered.trim().is_empty() {
        "()".to_string()
    } else {
        rendered
    }
}

/// Implementation of the `#[log_call]` attribute macro.
///
/// Transforms a function so every invocation emits an "entered" record, runs
/// the original body, and emits a matching "exited" record whether the body
/// returns or panics. The call signature, binding behavior, arguments,
/// return value, and any panic payload are untouched.
///
/// ```ignore
/// #[callwise::log_call]
/// fn foo() { /* ... */ }
///
/// #[callwise::log_call(logger_name = "my.error.logger", level = warning)]
/// fn handle_error() { /* ... */ }
/// ```
#[proc_macro_attribute]
pub fn log_call(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = match parse_attr_config(attr) {
        Ok(config) => config,
        Err(error) => return error,
    };

    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    // Find the function name, parameter list, and body
    let mut fn_name: Option<String> = None;
    let mut params_idx: Option<usize> = None;
    let mut body_idx: Option<usize> = None;
    let mut seen_fn = false;
    let mut is_async = false;
    let mut angle_depth = 0i32;
    let mut prev_char: Option<char> = None;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            TokenTree::Ident(ident) => {
                let name = ident.to_string();
                if !seen_fn {
                    if name == "async" {
                        is_async = true;
                    }
                    if name == "fn" {
                        seen_fn = true;
                    }
                } else if fn_name.is_none() {
                    fn_name = Some(name);
                }
                prev_char = None;
            }
            TokenTree::Punct(p) => {
                if fn_name.is_some() {
                    match p.as_char() {
                        '<' => angle_depth += 1,
                        '>' if prev_char != Some('-') => angle_depth -= 1,
                        _ => {}
                    }
                }
                prev_char = Some(p.as_char());
            }
            TokenTree::Group(g) => {
                if fn_name.is_some() && angle_depth == 0 {
                    match g.delimiter() {
                        Delimiter::Parenthesis if params_idx.is_none() => {
                            params_idx = Some(i);
                        }
                        Delimiter::Brace => {
                            // the last top-level brace group is the body
                            body_idx = Some(i);
                        }
                        _ => {}
                    }
                }
                prev_char = None;
            }
            TokenTree::Literal(_) => {
                prev_char = None;
            }
        }
    }

    if is_async {
        return "compile_error!(\"#[log_call] does not support async fn; the wrapper is synchronous end-to-end\")"
            .parse()
            .unwrap();
    }

    let fn_name = match fn_name {
        Some(name) => name,
        None => {
            return "compile_error!(\"#[log_call] can only be applied to functions\")"
                .parse()
                .unwrap();
        }
    };

    let params_idx = match params_idx {
        Some(idx) => idx,
        None => {
            return "compile_error!(\"#[log_call] can only be applied to functions\")"
                .parse()
                .unwrap();
        }
    };

    let body_idx = match body_idx {
        Some(idx) => idx,
        None => {
            return "compile_error!(\"#[log_call] requires a function with a body\")"
                .parse()
                .unwrap();
        }
    };

    let params = match &tokens[params_idx] {
        TokenTree::Group(g) => g.clone(),
        _ => unreachable!("params_idx points at a group"),
    };
    let original_body = match &tokens[body_idx] {
        TokenTree::Group(g) => g.clone(),
        _ => unreachable!("body_idx points at a group"),
    };

    let renders = split_params(&params)
        .iter()
        .map(|segment| param_render_expr(segment))
        .collect::<Vec<_>>()
        .join(", ");

    // The declared return type, used to annotate the return-rendering closure's
    // parameter. `render_value!` selects its Debug/Display tiers by autoref
    // specialization, which needs the value type to be concrete at the probe;
    // the closure parameter's type is otherwise an inference variable while the
    // body is checked, so the probe over-commits to the Display bound. Naming
    // the type (the function's own return type, always in scope in the body)
    // keeps the selection concrete without altering what is rendered.
    let return_type = extract_return_type(&tokens[params_idx + 1..body_idx]);

    // Arguments of the invoke() call; the original body group is pushed as-is
    // so the tokens inside it keep their spans.
    let invoke_args_src = format!(
        r#"concat!(module_path!(), "::", "{fn_name}"),
           callwise::hidden::call_config({logger_name}, {level_path}),
           ::std::panic::Location::caller(),
           __callwise_rendered_args,
           |__callwise_returned: &({return_type})| callwise::render_value!(*__callwise_returned),
           move ||"#,
        fn_name = fn_name,
        logger_name = config.logger_name,
        level_path = config.level_path,
        return_type = return_type,
    );
    let mut invoke_args: Vec<TokenTree> = invoke_args_src
        .parse::<TokenStream>()
        .unwrap()
        .into_iter()
        .collect();
    invoke_args.push(TokenTree::Group(original_body));

    let body_prelude_src = format!(
        "let __callwise_rendered_args = ::std::vec![{renders}]; callwise::hidden::invoke",
        renders = renders,
    );
    let mut new_body: Vec<TokenTree> = body_prelude_src
        .parse::<TokenStream>()
        .unwrap()
        .into_iter()
        .collect();
    new_body.push(TokenTree::Group(Group::new(
        Delimiter::Parenthesis,
        invoke_args.into_iter().collect(),
    )));

    tokens[body_idx] = TokenTree::Group(Group::new(
        Delimiter::Brace,
        new_body.into_iter().collect(),
    ));

    // #[track_caller] makes Location::caller() inside the new body resolve to
    // the wrapped function's own caller.
    let mut output: Vec<TokenTree> = "#[track_caller]"
        .parse::<TokenStream>()
        .unwrap()
        .into_iter()
        .collect();
    output.extend(tokens);
    output.into_iter().collect()
}
