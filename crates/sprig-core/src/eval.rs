use std::collections::HashSet;
use std::sync::Arc;

use im::Vector;
use once_cell::sync::Lazy;

use crate::ast::{form_to_value, value_to_form, Form, FormKind, LambdaData, Span, Value};
use crate::destructure::{destructure, REST_MARKER};
use crate::env::{define_root, new_ref, Env, EnvRef};
use crate::error::{SprigError, TraceFrame};
use crate::host::HostBridge;
use crate::printer::{form_to_string_elided, value_preview};

/// Nested lists deeper than this render as `(...)` in trace lines.
const TRACE_ELIDE_DEPTH: usize = 3;

static SPECIAL_FORMS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "if",
        "let",
        "def",
        "defn",
        "defmacro",
        "do",
        "#",
        "quote",
        "comment",
        ".",
        "$",
        "pyimport",
        "pyimport_from",
        "match",
        "and",
        "or",
        "macroexpand",
        "eval",
    ]
    .into_iter()
    .collect()
});

pub fn is_special_form(name: &str) -> bool {
    SPECIAL_FORMS.contains(name)
}

/// What a frame asks of the engine after one step. `Tail` replaces the
/// current frame instead of pushing, which is what keeps tail positions
/// from accumulating stack.
enum Step {
    Done(Value),
    Suspend(Form, EnvRef),
    Tail {
        form: Form,
        env: EnvRef,
        context: Option<String>,
    },
}

/// One suspended evaluation. `state` is the per-form state machine
/// position; `context` carries the callee name and argument snapshot for
/// frames that run a function body.
struct Frame {
    form: Form,
    env: EnvRef,
    state: State,
    context: Option<String>,
}

enum State {
    Enter,
    IfCond {
        then_form: Form,
        else_form: Option<Form>,
    },
    LetBind {
        scope: EnvRef,
        pairs: Vec<(Form, Form)>,
        idx: usize,
        body: Vec<Form>,
    },
    DefBind {
        names: Vec<String>,
        exprs: Vec<Form>,
        idx: usize,
    },
    DoSeq {
        forms: Vec<Form>,
        idx: usize,
    },
    QuoteBuild {
        parts: Vec<Form>,
        unquotes: Vec<Form>,
        results: Vec<Value>,
    },
    DotAttr {
        attr: String,
    },
    DollarLookup,
    EvalForm,
    AndSeq {
        forms: Vec<Form>,
        idx: usize,
    },
    OrSeq {
        forms: Vec<Form>,
        idx: usize,
    },
    MatchValue {
        clauses: Vec<(Form, Form)>,
    },
    ExpandTarget,
    ExpandResult,
    CallHead {
        args: Vec<Form>,
    },
    CallArgs {
        callee: Value,
        arg_forms: Vec<Form>,
        values: Vec<Value>,
        spread: bool,
    },
    MacroResult,
}

impl Frame {
    fn new(form: Form, env: EnvRef, context: Option<String>) -> Self {
        Self {
            form,
            env,
            state: State::Enter,
            context,
        }
    }
}

pub struct Evaluator {
    bridge: Arc<dyn HostBridge>,
}

impl Evaluator {
    pub fn new(bridge: Arc<dyn HostBridge>) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &Arc<dyn HostBridge> {
        &self.bridge
    }

    /// The engine loop: advance the top frame, then push, replace, or
    /// pop according to the step it returns. The host call stack stays
    /// flat no matter how deep user recursion goes.
    pub fn eval(&self, form: &Form, env: EnvRef) -> Result<Value, SprigError> {
        let mut stack = vec![Frame::new(form.clone(), env, None)];
        let mut register: Option<Value> = None;
        while !stack.is_empty() {
            let top = stack.len() - 1;
            let span = stack[top].form.span;
            let step = self
                .step_frame(&mut stack[top], register.take())
                .map_err(|err| self.fail(err.with_span(span), &stack))?;
            match step {
                Step::Done(value) => {
                    stack.pop();
                    register = Some(value);
                }
                Step::Suspend(child_form, child_env) => {
                    stack.push(Frame::new(child_form, child_env, None));
                }
                Step::Tail { form, env, context } => {
                    let context = context.or_else(|| stack[top].context.take());
                    stack[top] = Frame::new(form, env, context);
                }
            }
        }
        register.ok_or_else(|| SprigError::internal("engine finished without a result"))
    }

    /// Capture the live stack root-to-leaf into the error context.
    fn fail(&self, err: SprigError, stack: &[Frame]) -> SprigError {
        let trace = stack
            .iter()
            .map(|frame| TraceFrame {
                text: form_to_string_elided(&frame.form, TRACE_ELIDE_DEPTH),
                context: frame.context.clone(),
            })
            .collect();
        err.with_trace(trace)
    }

    fn step_frame(&self, frame: &mut Frame, input: Option<Value>) -> Result<Step, SprigError> {
        let state = std::mem::replace(&mut frame.state, State::Enter);
        match state {
            State::Enter => self.enter(frame),
            State::IfCond {
                then_form,
                else_form,
            } => {
                let cond = take_input(input)?;
                if self.truthy(&cond) {
                    Ok(tail(then_form, frame.env.clone()))
                } else {
                    match else_form {
                        Some(form) => Ok(tail(form, frame.env.clone())),
                        None => Ok(Step::Done(Value::Nil)),
                    }
                }
            }
            State::LetBind {
                scope,
                pairs,
                idx,
                body,
            } => {
                let value = take_input(input)?;
                let (pattern, _) = &pairs[idx];
                let bindings = destructure(pattern, &value)
                    .map_err(|m| SprigError::arity(format!("let binding: {}", m.reason)))?;
                install_bindings(&scope, bindings);
                let next = idx + 1;
                if next < pairs.len() {
                    let expr = pairs[next].1.clone();
                    frame.state = State::LetBind {
                        scope: scope.clone(),
                        pairs,
                        idx: next,
                        body,
                    };
                    Ok(Step::Suspend(expr, scope))
                } else {
                    Ok(tail(do_form(&body), scope))
                }
            }
            State::DefBind { names, exprs, idx } => {
                let value = take_input(input)?;
                define_root(&frame.env, &names[idx], value.clone());
                let next = idx + 1;
                if next < exprs.len() {
                    let expr = exprs[next].clone();
                    frame.state = State::DefBind {
                        names,
                        exprs,
                        idx: next,
                    };
                    Ok(Step::Suspend(expr, frame.env.clone()))
                } else {
                    Ok(Step::Done(value))
                }
            }
            State::DoSeq { forms, idx } => {
                // Intermediate results are discarded.
                take_input(input)?;
                if idx + 1 < forms.len() {
                    let next = forms[idx].clone();
                    frame.state = State::DoSeq {
                        forms,
                        idx: idx + 1,
                    };
                    Ok(Step::Suspend(next, frame.env.clone()))
                } else {
                    Ok(tail(forms[idx].clone(), frame.env.clone()))
                }
            }
            State::QuoteBuild {
                parts,
                unquotes,
                mut results,
            } => {
                results.push(take_input(input)?);
                if results.len() < unquotes.len() {
                    let next = unquotes[results.len()].clone();
                    frame.state = State::QuoteBuild {
                        parts,
                        unquotes,
                        results,
                    };
                    Ok(Step::Suspend(next, frame.env.clone()))
                } else {
                    Ok(Step::Done(finish_quote(&parts, results)?))
                }
            }
            State::DotAttr { attr } => {
                let object = take_input(input)?;
                let Value::Host(obj) = &object else {
                    return Err(SprigError::type_mismatch(
                        format!("host object (left of '.{}')", attr),
                        object.type_name(),
                    ));
                };
                self.bridge.get_attr(obj, &attr).map(Step::Done)
            }
            State::DollarLookup => {
                let value = take_input(input)?;
                let Value::Str(name) = &value else {
                    return Err(SprigError::type_mismatch("string", value.type_name()));
                };
                match frame.env.read().unwrap().get(name) {
                    Some(found) => Ok(Step::Done(found)),
                    None => Err(SprigError::unbound_symbol(name)),
                }
            }
            State::EvalForm => {
                let value = take_input(input)?;
                let form = value_to_form(&value)?;
                Ok(tail(form, frame.env.clone()))
            }
            State::AndSeq { forms, idx } => {
                let value = take_input(input)?;
                if !self.truthy(&value) {
                    return Ok(Step::Done(Value::Bool(false)));
                }
                if idx < forms.len() {
                    let next = forms[idx].clone();
                    frame.state = State::AndSeq {
                        forms,
                        idx: idx + 1,
                    };
                    Ok(Step::Suspend(next, frame.env.clone()))
                } else {
                    Ok(Step::Done(Value::Bool(true)))
                }
            }
            State::OrSeq { forms, idx } => {
                let value = take_input(input)?;
                if self.truthy(&value) {
                    return Ok(Step::Done(Value::Bool(true)));
                }
                if idx < forms.len() {
                    let next = forms[idx].clone();
                    frame.state = State::OrSeq {
                        forms,
                        idx: idx + 1,
                    };
                    Ok(Step::Suspend(next, frame.env.clone()))
                } else {
                    Ok(Step::Done(Value::Bool(false)))
                }
            }
            State::MatchValue { clauses } => {
                let value = take_input(input)?;
                for (pattern, result) in &clauses {
                    if let Ok(bindings) = destructure(pattern, &value) {
                        let scope = new_ref(Env::new_child(frame.env.clone()));
                        install_bindings(&scope, bindings);
                        return Ok(tail(result.clone(), scope));
                    }
                }
                Err(SprigError::no_match(format!(
                    "no pattern matched {}",
                    value_preview(&value, 40)
                )))
            }
            State::ExpandTarget => {
                let value = take_input(input)?;
                match self.macro_for_call(&value, &frame.env) {
                    Some((data, args)) => {
                        let scope = self.bind_macro_args(&data, args)?;
                        frame.state = State::ExpandResult;
                        Ok(Step::Suspend(do_form(&data.body), scope))
                    }
                    None => Ok(Step::Done(value)),
                }
            }
            // The expansion itself is returned as data, unevaluated.
            State::ExpandResult => Ok(Step::Done(take_input(input)?)),
            State::CallHead { args } => {
                let callee = take_input(input)?;
                let (arg_forms, spread) = split_spread(args)?;
                if arg_forms.is_empty() {
                    self.apply(callee, Vec::new())
                } else {
                    let first = arg_forms[0].clone();
                    frame.state = State::CallArgs {
                        callee,
                        arg_forms,
                        values: Vec::new(),
                        spread,
                    };
                    Ok(Step::Suspend(first, frame.env.clone()))
                }
            }
            State::CallArgs {
                callee,
                arg_forms,
                mut values,
                spread,
            } => {
                values.push(take_input(input)?);
                if values.len() < arg_forms.len() {
                    let next = arg_forms[values.len()].clone();
                    frame.state = State::CallArgs {
                        callee,
                        arg_forms,
                        values,
                        spread,
                    };
                    return Ok(Step::Suspend(next, frame.env.clone()));
                }
                if spread {
                    let tail_value = values.pop().unwrap_or(Value::Nil);
                    let Value::List(items) = tail_value else {
                        return Err(SprigError::type_mismatch(
                            "list (after '&')",
                            tail_value.type_name(),
                        ));
                    };
                    values.extend(items.into_iter());
                }
                self.apply(callee, values)
            }
            State::MacroResult => {
                let value = take_input(input)?;
                let expanded = value_to_form(&value)?;
                Ok(tail(expanded, frame.env.clone()))
            }
        }
    }

    fn enter(&self, frame: &mut Frame) -> Result<Step, SprigError> {
        let kind = frame.form.kind.clone();
        match kind {
            FormKind::Int(n) => Ok(Step::Done(Value::Int(n))),
            FormKind::Float(n) => Ok(Step::Done(Value::Float(n))),
            FormKind::Str(s) => Ok(Step::Done(Value::Str(s))),
            FormKind::Bool(b) => Ok(Step::Done(Value::Bool(b))),
            FormKind::Nil => Ok(Step::Done(Value::Nil)),
            FormKind::Symbol(name) => self.resolve_symbol(&name, &frame.env),
            FormKind::Quoted(inner) => self.begin_quote(frame, vec![*inner]),
            FormKind::Unquoted(_) => {
                Err(SprigError::runtime("unquote (~) outside a quoted form"))
            }
            FormKind::List(items) if items.is_empty() => {
                Ok(Step::Done(Value::List(Vector::new())))
            }
            FormKind::List(items) => {
                if let Some(head) = items[0].symbol_name() {
                    if is_special_form(head) {
                        let head = head.to_string();
                        return self.enter_special(frame, &head, items);
                    }
                    // A head symbol resolving to a macro diverts to the
                    // expander before any argument is evaluated.
                    if let Some(Value::Lambda(data)) = frame.env.read().unwrap().get(head) {
                        if data.is_macro {
                            let arg_data: Vector<Value> =
                                items[1..].iter().map(form_to_value).collect();
                            let scope = self.bind_macro_args(&data, arg_data)?;
                            frame.state = State::MacroResult;
                            return Ok(Step::Suspend(do_form(&data.body), scope));
                        }
                    }
                }
                let head = items[0].clone();
                frame.state = State::CallHead {
                    args: items[1..].to_vec(),
                };
                Ok(Step::Suspend(head, frame.env.clone()))
            }
        }
    }

    fn enter_special(
        &self,
        frame: &mut Frame,
        name: &str,
        items: Vec<Form>,
    ) -> Result<Step, SprigError> {
        let rest = &items[1..];
        match name {
            "if" => {
                if rest.len() != 2 && rest.len() != 3 {
                    return Err(SprigError::runtime(
                        "if expects a condition, a then-branch, and an optional else-branch",
                    ));
                }
                frame.state = State::IfCond {
                    then_form: rest[1].clone(),
                    else_form: rest.get(2).cloned(),
                };
                Ok(Step::Suspend(rest[0].clone(), frame.env.clone()))
            }
            "let" => {
                if rest.len() < 2 {
                    return Err(SprigError::runtime("let expects bindings and a body"));
                }
                let Some(binding_items) = rest[0].list_items() else {
                    return Err(SprigError::runtime("let bindings must be a list"));
                };
                if binding_items.len() % 2 != 0 {
                    return Err(SprigError::runtime(
                        "let bindings must pair each pattern with an expression",
                    ));
                }
                let pairs: Vec<(Form, Form)> = binding_items
                    .chunks(2)
                    .map(|chunk| (chunk[0].clone(), chunk[1].clone()))
                    .collect();
                let body = rest[1..].to_vec();
                let scope = new_ref(Env::new_child(frame.env.clone()));
                if pairs.is_empty() {
                    return Ok(tail(do_form(&body), scope));
                }
                let first = pairs[0].1.clone();
                frame.state = State::LetBind {
                    scope: scope.clone(),
                    pairs,
                    idx: 0,
                    body,
                };
                Ok(Step::Suspend(first, scope))
            }
            "def" => {
                if rest.is_empty() || rest.len() % 2 != 0 {
                    return Err(SprigError::runtime(
                        "def expects name/expression pairs",
                    ));
                }
                let mut names = Vec::with_capacity(rest.len() / 2);
                let mut exprs = Vec::with_capacity(rest.len() / 2);
                for chunk in rest.chunks(2) {
                    let Some(name) = chunk[0].symbol_name() else {
                        return Err(
                            SprigError::runtime("def name must be a symbol")
                                .with_span(chunk[0].span),
                        );
                    };
                    names.push(name.to_string());
                    exprs.push(chunk[1].clone());
                }
                let first = exprs[0].clone();
                frame.state = State::DefBind {
                    names,
                    exprs,
                    idx: 0,
                };
                Ok(Step::Suspend(first, frame.env.clone()))
            }
            "defn" => self.define_callable(frame, rest, false),
            "defmacro" => self.define_callable(frame, rest, true),
            "do" => {
                if rest.is_empty() {
                    return Ok(Step::Done(Value::Nil));
                }
                let forms = rest.to_vec();
                if forms.len() == 1 {
                    return Ok(tail(forms[0].clone(), frame.env.clone()));
                }
                let first = forms[0].clone();
                frame.state = State::DoSeq { forms, idx: 1 };
                Ok(Step::Suspend(first, frame.env.clone()))
            }
            "#" => {
                let lambda = make_short_fn(rest, &frame.env);
                Ok(Step::Done(lambda))
            }
            "quote" => self.begin_quote(frame, rest.to_vec()),
            "comment" => Ok(Step::Done(Value::Nil)),
            "." => {
                if rest.len() != 2 {
                    return Err(SprigError::runtime(
                        ". expects an object and an attribute name",
                    ));
                }
                let Some(attr) = rest[1].symbol_name() else {
                    return Err(
                        SprigError::runtime(". attribute name must be a bare symbol")
                            .with_span(rest[1].span),
                    );
                };
                frame.state = State::DotAttr {
                    attr: attr.to_string(),
                };
                Ok(Step::Suspend(rest[0].clone(), frame.env.clone()))
            }
            "$" => {
                if rest.len() != 1 {
                    return Err(SprigError::runtime("$ expects one expression"));
                }
                frame.state = State::DollarLookup;
                Ok(Step::Suspend(rest[0].clone(), frame.env.clone()))
            }
            "eval" => {
                if rest.len() != 1 {
                    return Err(SprigError::runtime("eval expects one expression"));
                }
                frame.state = State::EvalForm;
                Ok(Step::Suspend(rest[0].clone(), frame.env.clone()))
            }
            "pyimport" => {
                if rest.is_empty() {
                    return Err(SprigError::runtime(
                        "pyimport expects at least one module name",
                    ));
                }
                for form in rest {
                    let Some(name) = form.symbol_name() else {
                        return Err(
                            SprigError::runtime("pyimport module name must be a symbol")
                                .with_span(form.span),
                        );
                    };
                    let module = self.bridge.import_module(name)?;
                    let leaf = name.rsplit('.').next().unwrap_or(name);
                    define_root(&frame.env, leaf, module);
                }
                Ok(Step::Done(Value::Nil))
            }
            "pyimport_from" => {
                if rest.len() != 2 {
                    return Err(SprigError::runtime(
                        "pyimport_from expects a module and an attribute name",
                    ));
                }
                let (Some(module_name), Some(attr_name)) =
                    (rest[0].symbol_name(), rest[1].symbol_name())
                else {
                    return Err(SprigError::runtime(
                        "pyimport_from arguments must be symbols",
                    ));
                };
                let module = self.bridge.import_module(module_name)?;
                let Value::Host(obj) = &module else {
                    return Err(SprigError::type_mismatch(
                        "host module object",
                        module.type_name(),
                    ));
                };
                let value = self.bridge.get_attr(obj, attr_name)?;
                define_root(&frame.env, attr_name, value);
                Ok(Step::Done(Value::Nil))
            }
            "match" => {
                if rest.is_empty() {
                    return Err(SprigError::runtime(
                        "match expects an expression and clauses",
                    ));
                }
                let mut clauses = Vec::with_capacity(rest.len() - 1);
                for clause in &rest[1..] {
                    let Some(parts) = clause.list_items() else {
                        return Err(
                            SprigError::runtime("match clause must be a (pattern result) list")
                                .with_span(clause.span),
                        );
                    };
                    if parts.len() != 2 {
                        return Err(
                            SprigError::runtime("match clause must be a (pattern result) list")
                                .with_span(clause.span),
                        );
                    }
                    clauses.push((parts[0].clone(), parts[1].clone()));
                }
                frame.state = State::MatchValue { clauses };
                Ok(Step::Suspend(rest[0].clone(), frame.env.clone()))
            }
            "and" => {
                if rest.is_empty() {
                    return Ok(Step::Done(Value::Bool(true)));
                }
                let forms = rest.to_vec();
                let first = forms[0].clone();
                frame.state = State::AndSeq { forms, idx: 1 };
                Ok(Step::Suspend(first, frame.env.clone()))
            }
            "or" => {
                if rest.is_empty() {
                    return Ok(Step::Done(Value::Bool(false)));
                }
                let forms = rest.to_vec();
                let first = forms[0].clone();
                frame.state = State::OrSeq { forms, idx: 1 };
                Ok(Step::Suspend(first, frame.env.clone()))
            }
            "macroexpand" => {
                if rest.len() != 1 {
                    return Err(SprigError::runtime("macroexpand expects one expression"));
                }
                frame.state = State::ExpandTarget;
                Ok(Step::Suspend(rest[0].clone(), frame.env.clone()))
            }
            _ => Err(SprigError::internal(format!(
                "special form '{}' has no handler",
                name
            ))),
        }
    }

    fn define_callable(
        &self,
        frame: &Frame,
        rest: &[Form],
        is_macro: bool,
    ) -> Result<Step, SprigError> {
        let what = if is_macro { "defmacro" } else { "defn" };
        if rest.len() < 3 {
            return Err(SprigError::runtime(format!(
                "{} expects a name, a parameter list, and a body",
                what
            )));
        }
        let Some(name) = rest[0].symbol_name() else {
            return Err(
                SprigError::runtime(format!("{} name must be a symbol", what))
                    .with_span(rest[0].span),
            );
        };
        validate_params(&rest[1])?;
        let lambda = Value::Lambda(Arc::new(LambdaData {
            name: Some(name.to_string()),
            params: rest[1].clone(),
            body: rest[2..].to_vec(),
            env: frame.env.clone(),
            is_macro,
        }));
        define_root(&frame.env, name, lambda.clone());
        Ok(Step::Done(lambda))
    }

    fn begin_quote(&self, frame: &mut Frame, parts: Vec<Form>) -> Result<Step, SprigError> {
        if parts.is_empty() {
            return Ok(Step::Done(Value::Nil));
        }
        let mut unquotes = Vec::new();
        for part in &parts {
            collect_unquotes(part, &mut unquotes);
        }
        if unquotes.is_empty() {
            return Ok(Step::Done(finish_quote(&parts, Vec::new())?));
        }
        let first = unquotes[0].clone();
        frame.state = State::QuoteBuild {
            parts,
            unquotes,
            results: Vec::new(),
        };
        Ok(Step::Suspend(first, frame.env.clone()))
    }

    /// If `value` is `(name arg...)` data whose head names a macro in
    /// `env`, return the macro and the raw argument data.
    fn macro_for_call(&self, value: &Value, env: &EnvRef) -> Option<(Arc<LambdaData>, Vector<Value>)> {
        let Value::List(items) = value else {
            return None;
        };
        let Some(Value::Symbol(head)) = items.front() else {
            return None;
        };
        match env.read().unwrap().get(head) {
            Some(Value::Lambda(data)) if data.is_macro => {
                Some((data, items.iter().skip(1).cloned().collect()))
            }
            _ => None,
        }
    }

    /// Bind unevaluated argument data against a macro's parameters in a
    /// fresh child of its captured environment.
    fn bind_macro_args(
        &self,
        data: &Arc<LambdaData>,
        args: Vector<Value>,
    ) -> Result<EnvRef, SprigError> {
        let bindings = destructure(&data.params, &Value::List(args))
            .map_err(|m| SprigError::arity(format!("{}: {}", data.describe(), m.reason)))?;
        let scope = new_ref(Env::new_child(data.env.clone()));
        install_bindings(&scope, bindings);
        Ok(scope)
    }

    fn apply(&self, callee: Value, args: Vec<Value>) -> Result<Step, SprigError> {
        match callee {
            Value::Native(native) => {
                if !native.arity().accepts(args.len()) {
                    return Err(SprigError::arity(format!(
                        "{} expects {} arguments, got {}",
                        native.name(),
                        native.arity().describe(),
                        args.len()
                    )));
                }
                native.call(&args).map(Step::Done)
            }
            Value::Lambda(data) if data.is_macro => Err(SprigError::not_callable(format!(
                "{} transforms forms and cannot be applied to evaluated arguments",
                data.describe()
            ))),
            Value::Lambda(data) => {
                let arg_list = Value::List(args.into_iter().collect());
                let bindings = destructure(&data.params, &arg_list)
                    .map_err(|m| SprigError::arity(format!("{}: {}", data.describe(), m.reason)))?;
                let context = call_context(&data, &bindings);
                let scope = new_ref(Env::new_child(data.env.clone()));
                install_bindings(&scope, bindings);
                Ok(Step::Tail {
                    form: do_form(&data.body),
                    env: scope,
                    context: Some(context),
                })
            }
            Value::Host(obj) => self.bridge.call(&obj, &args, &[]).map(Step::Done),
            other => Err(SprigError::not_callable(format!(
                "value of type {} is not callable",
                other.type_name()
            ))),
        }
    }

    fn resolve_symbol(&self, name: &str, env: &EnvRef) -> Result<Step, SprigError> {
        if let Some(value) = env.read().unwrap().get(name) {
            return Ok(Step::Done(value));
        }
        // `json.loads` style: resolve the head, then walk attributes
        // through the bridge.
        if name.contains('.') {
            let segments: Vec<&str> = name.split('.').collect();
            if segments.len() >= 2 && segments.iter().all(|s| !s.is_empty()) {
                let Some(mut value) = env.read().unwrap().get(segments[0]) else {
                    return Err(SprigError::unbound_symbol(name));
                };
                for attr in &segments[1..] {
                    let Value::Host(obj) = &value else {
                        return Err(SprigError::type_mismatch(
                            format!("host object (while resolving '{}')", name),
                            value.type_name(),
                        ));
                    };
                    value = self.bridge.get_attr(obj, attr)?;
                }
                return Ok(Step::Done(value));
            }
        }
        Err(SprigError::unbound_symbol(name))
    }

    fn truthy(&self, value: &Value) -> bool {
        match value {
            Value::Host(obj) => self.bridge.is_truthy(obj),
            other => other.is_truthy(),
        }
    }
}

fn tail(form: Form, env: EnvRef) -> Step {
    Step::Tail {
        form,
        env,
        context: None,
    }
}

fn take_input(input: Option<Value>) -> Result<Value, SprigError> {
    input.ok_or_else(|| SprigError::internal("frame resumed without a result"))
}

fn install_bindings(scope: &EnvRef, bindings: Vec<(String, Value)>) {
    let mut guard = scope.write().unwrap();
    for (name, value) in bindings {
        guard.set(&name, value);
    }
}

/// Wrap a multi-form body in `(do ...)` so a single frame can run it.
fn do_form(body: &[Form]) -> Form {
    match body {
        [] => Form::new(FormKind::Nil, Span::synthetic()),
        [single] => single.clone(),
        many => {
            let span = many[0].span;
            let mut items = Vec::with_capacity(many.len() + 1);
            items.push(Form::symbol("do", span));
            items.extend(many.iter().cloned());
            Form::list(items, span)
        }
    }
}

fn call_context(data: &LambdaData, bindings: &[(String, Value)]) -> String {
    let name = data.name.as_deref().unwrap_or("<fn>");
    if bindings.is_empty() {
        return name.to_string();
    }
    let parts: Vec<String> = bindings
        .iter()
        .map(|(key, value)| format!("{}={}", key, value_preview(value, 24)))
        .collect();
    format!("{} ({})", name, parts.join(" "))
}

/// Reject `&` anywhere but final-but-one in a parameter list, the same
/// rule the destructurer applies at call time, but caught at definition.
fn validate_params(form: &Form) -> Result<(), SprigError> {
    let Some(items) = form.list_items() else {
        return Err(
            SprigError::runtime("parameter list must be a list").with_span(form.span),
        );
    };
    for (idx, item) in items.iter().enumerate() {
        if item.symbol_name() == Some(REST_MARKER) && idx + 2 != items.len() {
            return Err(SprigError::runtime(
                "varargs '&' must sit in final-but-one position",
            )
            .with_span(item.span));
        }
    }
    Ok(())
}

/// Split call-site spread: `(f a & xs)` evaluates `a` and `xs`, then
/// splices `xs` into the argument vector.
fn split_spread(args: Vec<Form>) -> Result<(Vec<Form>, bool), SprigError> {
    let marker_at = args
        .iter()
        .position(|form| form.symbol_name() == Some(REST_MARKER));
    match marker_at {
        None => Ok((args, false)),
        Some(pos) if pos + 2 == args.len() => {
            let mut forms = Vec::with_capacity(args.len() - 1);
            forms.extend(args[..pos].iter().cloned());
            forms.push(args[pos + 1].clone());
            Ok((forms, true))
        }
        Some(pos) => Err(SprigError::runtime(
            "spread '&' must sit in final-but-one argument position",
        )
        .with_span(args[pos].span)),
    }
}

/// Depth-first collection of the `~` escapes a quote must evaluate, in
/// source order. Nested quotes own their escapes and are skipped.
fn collect_unquotes(form: &Form, out: &mut Vec<Form>) {
    match &form.kind {
        FormKind::Unquoted(inner) => out.push((**inner).clone()),
        FormKind::Quoted(_) => {}
        FormKind::List(items) => {
            if items.first().and_then(|f| f.symbol_name()) == Some("quote") {
                return;
            }
            for item in items {
                collect_unquotes(item, out);
            }
        }
        _ => {}
    }
}

fn finish_quote(parts: &[Form], results: Vec<Value>) -> Result<Value, SprigError> {
    let mut results = results.into_iter();
    let mut values = Vec::with_capacity(parts.len());
    for part in parts {
        values.push(build_quoted(part, &mut results)?);
    }
    if values.len() == 1 {
        Ok(values.pop().unwrap_or(Value::Nil))
    } else {
        Ok(Value::List(values.into_iter().collect()))
    }
}

fn build_quoted(
    form: &Form,
    results: &mut std::vec::IntoIter<Value>,
) -> Result<Value, SprigError> {
    match &form.kind {
        FormKind::Unquoted(_) => results
            .next()
            .ok_or_else(|| SprigError::internal("quote lost an unquote result")),
        FormKind::Quoted(_) => Ok(form_to_value(form)),
        FormKind::List(items) => {
            if items.first().and_then(|f| f.symbol_name()) == Some("quote") {
                return Ok(form_to_value(form));
            }
            let mut out = Vector::new();
            for item in items {
                out.push_back(build_quoted(item, results)?);
            }
            Ok(Value::List(out))
        }
        _ => Ok(form_to_value(form)),
    }
}

/// `(# body...)` builds a function whose parameters are synthesized from the highest `%i`
/// placeholder. Nested `#` forms have their own placeholder namespace
/// and are not scanned.
fn make_short_fn(body: &[Form], env: &EnvRef) -> Value {
    let mut max_index: Option<usize> = None;
    for form in body {
        placeholder_max(form, &mut max_index);
    }
    let param_count = max_index.map_or(0, |max| max + 1);
    let params = Form::list(
        (0..param_count)
            .map(|idx| Form::symbol(format!("%{}", idx), Span::synthetic()))
            .collect(),
        Span::synthetic(),
    );
    // One body form is the body itself; several make a call form, so
    // `(# * %0 2)` is a function of one argument computing `(* %0 2)`.
    let body_form = match body {
        [] => Form::new(FormKind::Nil, Span::synthetic()),
        [single] => single.clone(),
        many => Form::list(many.to_vec(), many[0].span),
    };
    Value::Lambda(Arc::new(LambdaData {
        name: None,
        params,
        body: vec![body_form],
        env: env.clone(),
        is_macro: false,
    }))
}

fn record_placeholder(max: &mut Option<usize>, idx: usize) {
    *max = Some(max.map_or(idx, |current| current.max(idx)));
}

fn placeholder_max(form: &Form, max: &mut Option<usize>) {
    match &form.kind {
        FormKind::Symbol(name) => {
            if let Some(idx) = parse_placeholder(name) {
                record_placeholder(max, idx);
            }
        }
        FormKind::List(items) => {
            if items.first().and_then(|f| f.symbol_name()) == Some("#") {
                return;
            }
            // `($ "%i")` is a placeholder reference manufactured from a
            // literal string; it is statically known, so it counts
            // toward the arity like the bare symbol would.
            if items.len() == 2 && items[0].symbol_name() == Some("$") {
                if let FormKind::Str(text) = &items[1].kind {
                    if let Some(idx) = parse_placeholder(text) {
                        record_placeholder(max, idx);
                        return;
                    }
                }
            }
            for item in items {
                placeholder_max(item, max);
            }
        }
        FormKind::Quoted(inner) | FormKind::Unquoted(inner) => placeholder_max(inner, max),
        _ => {}
    }
}

fn parse_placeholder(name: &str) -> Option<usize> {
    let digits = name.strip_prefix('%')?;
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    digits.parse::<usize>().ok()
}
