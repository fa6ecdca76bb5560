//! The emission pass (§4.5-4.6): turns one function's [`bc_ast::Stmt`] body
//! into LLVM instructions. Runs after every top-level name has a declared
//! cell (§4.4), so forward calls and forward `goto`s resolve without a
//! second pass over this function.

use std::collections::HashMap;

use bc_ast::{AssignOp, BinOp, Definition, Expr, GlobalKind, GlobalScope, Place, Scope, Stmt};
use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::values::{FunctionValue, IntValue, PointerValue};
use inkwell::IntPredicate;
use tracing::instrument;

use crate::bridge::{const_ptr_to_word, ptr_to_word, word_to_ptr};
use crate::context::CodegenCtx;
use crate::declare::declare_extern_fallback;
use crate::value::PlaceRef;
use crate::BcCodegenError;

/// One nested `switch`'s dispatch targets, alive for the duration of
/// emitting its body so `case`/`default`/`break` inside it know where to
/// go. Every target block is created before any statement in the body is
/// emitted (§4.6's switch resolution), so fallthrough between cases is
/// just "don't add a branch before falling into the next block".
struct SwitchFrame<'ll> {
    case_blocks: HashMap<i64, BasicBlock<'ll>>,
    default_block: Option<BasicBlock<'ll>>,
    merge_block: BasicBlock<'ll>,
}

pub struct FnCtx<'ll, 'a> {
    ctx: &'a CodegenCtx<'ll>,
    function: FunctionValue<'ll>,
    builder: Builder<'ll>,
    scope: Scope<'a>,
    locals: HashMap<String, PointerValue<'ll>>,
    labels: HashMap<String, BasicBlock<'ll>>,
    break_targets: Vec<BasicBlock<'ll>>,
    switch_stack: Vec<SwitchFrame<'ll>>,
    block_counter: u32,
}

#[instrument(skip(ctx, globals, def))]
pub fn emit_function<'ll>(
    ctx: &CodegenCtx<'ll>,
    globals: &GlobalScope,
    def: &Definition,
) -> Result<(), BcCodegenError> {
    let Definition::Function { name, params, body } = def else {
        return Err(BcCodegenError::Ice("emit_function called on a non-function".into()));
    };

    let function = ctx
        .get_function(name)
        .ok_or_else(|| BcCodegenError::Ice(format!("`{name}` was not predeclared")))?;
    let entry_bb = ctx.ll_context.append_basic_block(function, "entry");
    let builder = ctx.ll_context.create_builder();
    builder.position_at_end(entry_bb);

    let mut fn_ctx = FnCtx {
        ctx,
        function,
        builder,
        scope: Scope::new(globals),
        locals: HashMap::new(),
        labels: HashMap::new(),
        break_targets: Vec::new(),
        switch_stack: Vec::new(),
        block_counter: 0,
    };

    let mut label_names = Vec::new();
    collect_labels(body, &mut label_names);
    for label in &label_names {
        let bb = ctx.ll_context.append_basic_block(function, &format!("label.{label}"));
        fn_ctx.labels.insert(label.clone(), bb);
    }

    for (i, param) in params.iter().enumerate() {
        let cell = fn_ctx
            .builder
            .build_alloca(ctx.word_type(), param)
            .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
        let arg = function
            .get_nth_param(i as u32)
            .ok_or_else(|| BcCodegenError::Ice(format!("missing parameter {i} of `{name}`")))?
            .into_int_value();
        fn_ctx
            .builder
            .build_store(cell, arg)
            .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
        fn_ctx.scope.declare_local(param).map_err(BcCodegenError::from)?;
        fn_ctx.locals.insert(param.clone(), cell);
    }

    fn_ctx.emit_stmt(body)?;

    if fn_ctx.current_block_is_open() {
        let zero = ctx.word_type().const_zero();
        fn_ctx
            .builder
            .build_return(Some(&zero))
            .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
    }

    Ok(())
}

/// Collects every label name reachable in `stmt` without crossing into a
/// nested function (there is none: B bodies don't nest functions), so every
/// label has a basic block ready before any `goto` to it is emitted.
fn collect_labels(stmt: &Stmt, out: &mut Vec<String>) {
    match stmt {
        Stmt::Compound(stmts) => stmts.iter().for_each(|s| collect_labels(s, out)),
        Stmt::If { then_branch, else_branch, .. } => {
            collect_labels(then_branch, out);
            if let Some(e) = else_branch {
                collect_labels(e, out);
            }
        }
        Stmt::While { body, .. } => collect_labels(body, out),
        Stmt::Switch { body, .. } => collect_labels(body, out),
        Stmt::Case { body, .. } => collect_labels(body, out),
        Stmt::Default { body } => collect_labels(body, out),
        Stmt::Label { name, body } => {
            out.push(name.clone());
            collect_labels(body, out);
        }
        _ => {}
    }
}

/// Collects `case`/`default` targets of the nearest enclosing `switch`,
/// without crossing into a nested one. Mirrors [`collect_labels`]'s
/// traversal shape.
fn collect_switch_targets<'ll>(
    ctx: &CodegenCtx<'ll>,
    function: FunctionValue<'ll>,
    stmt: &Stmt,
    case_blocks: &mut HashMap<i64, BasicBlock<'ll>>,
    default_block: &mut Option<BasicBlock<'ll>>,
) {
    match stmt {
        Stmt::Compound(stmts) => stmts
            .iter()
            .for_each(|s| collect_switch_targets(ctx, function, s, case_blocks, default_block)),
        Stmt::If { then_branch, else_branch, .. } => {
            collect_switch_targets(ctx, function, then_branch, case_blocks, default_block);
            if let Some(e) = else_branch {
                collect_switch_targets(ctx, function, e, case_blocks, default_block);
            }
        }
        Stmt::While { body, .. } => collect_switch_targets(ctx, function, body, case_blocks, default_block),
        Stmt::Label { body, .. } => collect_switch_targets(ctx, function, body, case_blocks, default_block),
        Stmt::Case { value, body } => {
            let bb = ctx.ll_context.append_basic_block(function, &format!("case.{value}"));
            case_blocks.insert(*value, bb);
            collect_switch_targets(ctx, function, body, case_blocks, default_block);
        }
        Stmt::Default { body } => {
            let bb = ctx.ll_context.append_basic_block(function, "switch.default");
            *default_block = Some(bb);
            collect_switch_targets(ctx, function, body, case_blocks, default_block);
        }
        // Switch/Break/Return/Goto do not extend the enclosing switch's targets.
        _ => {}
    }
}

impl<'ll, 'a> FnCtx<'ll, 'a> {
    fn current_block_is_open(&self) -> bool {
        self.builder
            .get_insert_block()
            .map(|bb| bb.get_terminator().is_none())
            .unwrap_or(false)
    }

    /// Opens a fresh block for code that follows a terminator (`return`,
    /// `goto`, `break`), so later sibling statements in the same compound
    /// still have somewhere to go even though they're unreachable.
    fn open_dead_block(&mut self, tag: &str) {
        self.block_counter += 1;
        let bb = self
            .ctx
            .ll_context
            .append_basic_block(self.function, &format!("{tag}.{}", self.block_counter));
        self.builder.position_at_end(bb);
    }

    fn branch_if_open(&mut self, target: BasicBlock<'ll>) -> Result<(), BcCodegenError> {
        if self.current_block_is_open() {
            self.builder
                .build_unconditional_branch(target)
                .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
        }
        Ok(())
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), BcCodegenError> {
        match stmt {
            Stmt::Auto(decls) => self.emit_auto(decls),
            Stmt::Extrn(names) => {
                for name in names {
                    self.scope.declare_extrn(name).map_err(BcCodegenError::from)?;
                    if self.ctx.get_function(name).is_none() && self.ctx.get_global(name).is_none() {
                        declare_extern_fallback(self.ctx, name);
                    }
                }
                Ok(())
            }
            Stmt::Compound(stmts) => {
                self.scope.enter_block();
                for s in stmts {
                    self.emit_stmt(s)?;
                }
                self.scope.exit_block();
                Ok(())
            }
            Stmt::If { cond, then_branch, else_branch } => self.emit_if(cond, then_branch, else_branch.as_deref()),
            Stmt::While { cond, body } => self.emit_while(cond, body),
            Stmt::Switch { scrutinee, body } => self.emit_switch(scrutinee, body),
            Stmt::Case { value, body } => self.emit_case(*value, body),
            Stmt::Default { body } => self.emit_default(body),
            Stmt::Break => self.emit_break(),
            Stmt::Return(expr) => self.emit_return(expr.as_ref()),
            Stmt::Goto(name) => self.emit_goto(name),
            Stmt::Label { name, body } => self.emit_label(name, body),
            Stmt::Null => Ok(()),
            Stmt::Expr(expr) => self.emit_expr(expr).map(|_| ()),
        }
    }

    fn emit_auto(&mut self, decls: &[(String, Option<u64>)]) -> Result<(), BcCodegenError> {
        let word_ty = self.ctx.word_type();
        for (name, size) in decls {
            self.scope.declare_local(name).map_err(BcCodegenError::from)?;
            match size {
                None => {
                    let cell = self
                        .builder
                        .build_alloca(word_ty, name)
                        .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
                    self.builder
                        .build_store(cell, word_ty.const_zero())
                        .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
                    self.locals.insert(name.clone(), cell);
                }
                Some(extra_words) => {
                    let len = extra_words + 1;
                    let array_ty = word_ty.array_type(len as u32);
                    let data = self
                        .builder
                        .build_alloca(array_ty, &format!("{name}$data"))
                        .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
                    // Under opaque pointers the address of an array alloca
                    // and the address of its element 0 are the same value;
                    // no GEP is needed to get the backing array's base.
                    let backlink = ptr_to_word(self.ctx, &self.builder, data)?;
                    let cell = self
                        .builder
                        .build_alloca(word_ty, name)
                        .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
                    self.builder
                        .build_store(cell, backlink)
                        .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
                    self.locals.insert(name.clone(), cell);
                }
            }
        }
        Ok(())
    }

    fn emit_if(
        &mut self,
        cond: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> Result<(), BcCodegenError> {
        let cond_val = self.emit_truthy(cond)?;
        let then_bb = self.ctx.ll_context.append_basic_block(self.function, "if.then");
        let else_bb = self.ctx.ll_context.append_basic_block(self.function, "if.else");
        let merge_bb = self.ctx.ll_context.append_basic_block(self.function, "if.end");

        self.builder
            .build_conditional_branch(cond_val, then_bb, else_bb)
            .map_err(|e| BcCodegenError::Ice(e.to_string()))?;

        self.builder.position_at_end(then_bb);
        self.emit_stmt(then_branch)?;
        self.branch_if_open(merge_bb)?;

        self.builder.position_at_end(else_bb);
        if let Some(else_branch) = else_branch {
            self.emit_stmt(else_branch)?;
        }
        self.branch_if_open(merge_bb)?;

        self.builder.position_at_end(merge_bb);
        Ok(())
    }

    fn emit_while(&mut self, cond: &Expr, body: &Stmt) -> Result<(), BcCodegenError> {
        let cond_bb = self.ctx.ll_context.append_basic_block(self.function, "while.cond");
        let body_bb = self.ctx.ll_context.append_basic_block(self.function, "while.body");
        let after_bb = self.ctx.ll_context.append_basic_block(self.function, "while.end");

        self.builder
            .build_unconditional_branch(cond_bb)
            .map_err(|e| BcCodegenError::Ice(e.to_string()))?;

        self.builder.position_at_end(cond_bb);
        let cond_val = self.emit_truthy(cond)?;
        self.builder
            .build_conditional_branch(cond_val, body_bb, after_bb)
            .map_err(|e| BcCodegenError::Ice(e.to_string()))?;

        self.builder.position_at_end(body_bb);
        self.break_targets.push(after_bb);
        self.emit_stmt(body)?;
        self.break_targets.pop();
        self.branch_if_open(cond_bb)?;

        self.builder.position_at_end(after_bb);
        Ok(())
    }

    fn emit_switch(&mut self, scrutinee: &Expr, body: &Stmt) -> Result<(), BcCodegenError> {
        let scrutinee_val = self.emit_expr(scrutinee)?;

        let mut case_blocks = HashMap::new();
        let mut default_block = None;
        collect_switch_targets(self.ctx, self.function, body, &mut case_blocks, &mut default_block);

        let merge_bb = self.ctx.ll_context.append_basic_block(self.function, "switch.end");
        let else_bb = default_block.unwrap_or(merge_bb);
        let cases = case_blocks
            .iter()
            .map(|(value, bb)| (self.ctx.word_type().const_int(*value as u64, true), *bb))
            .collect::<Vec<_>>();

        self.builder
            .build_switch(scrutinee_val, else_bb, &cases)
            .map_err(|e| BcCodegenError::Ice(e.to_string()))?;

        // Nothing is emitted into the entry block after the dispatch; park
        // the builder somewhere live so stray instructions before the first
        // case (dead B code, but still legal to write) have a home.
        self.open_dead_block("switch.unreachable");

        self.switch_stack.push(SwitchFrame { case_blocks, default_block, merge_block: merge_bb });
        self.break_targets.push(merge_bb);
        self.emit_stmt(body)?;
        self.break_targets.pop();
        self.switch_stack.pop();

        self.branch_if_open(merge_bb)?;
        self.builder.position_at_end(merge_bb);
        Ok(())
    }

    fn emit_case(&mut self, value: i64, body: &Stmt) -> Result<(), BcCodegenError> {
        let frame = self
            .switch_stack
            .last()
            .ok_or_else(|| BcCodegenError::Semantic("`case` outside a `switch`".into()))?;
        let bb = *frame
            .case_blocks
            .get(&value)
            .expect("collect_switch_targets pre-creates every case block");
        // Falling into this case from the statement above it (fallthrough).
        self.branch_if_open(bb)?;
        self.builder.position_at_end(bb);
        self.emit_stmt(body)
    }

    fn emit_default(&mut self, body: &Stmt) -> Result<(), BcCodegenError> {
        let frame = self
            .switch_stack
            .last()
            .ok_or_else(|| BcCodegenError::Semantic("`default` outside a `switch`".into()))?;
        let bb = frame
            .default_block
            .expect("collect_switch_targets pre-creates the default block when one exists");
        self.branch_if_open(bb)?;
        self.builder.position_at_end(bb);
        self.emit_stmt(body)
    }

    /// A `break` with no enclosing `while`/`switch` is a no-op, not an
    /// error: the boundary case is reachable from plain unstructured B code
    /// and the historical compiler accepts it silently.
    fn emit_break(&mut self) -> Result<(), BcCodegenError> {
        let Some(&target) = self.break_targets.last() else {
            return Ok(());
        };
        self.builder
            .build_unconditional_branch(target)
            .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
        self.open_dead_block("after_break");
        Ok(())
    }

    fn emit_return(&mut self, expr: Option<&Expr>) -> Result<(), BcCodegenError> {
        let value = match expr {
            Some(e) => self.emit_expr(e)?,
            None => self.ctx.word_type().const_zero(),
        };
        self.builder
            .build_return(Some(&value))
            .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
        self.open_dead_block("after_return");
        Ok(())
    }

    fn emit_goto(&mut self, name: &str) -> Result<(), BcCodegenError> {
        let target = *self
            .labels
            .get(name)
            .ok_or_else(|| BcCodegenError::Semantic(format!("goto to undeclared label `{name}`")))?;
        self.builder
            .build_unconditional_branch(target)
            .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
        self.open_dead_block("after_goto");
        Ok(())
    }

    fn emit_label(&mut self, name: &str, body: &Stmt) -> Result<(), BcCodegenError> {
        let bb = *self
            .labels
            .get(name)
            .expect("collect_labels pre-creates every label block");
        self.branch_if_open(bb)?;
        self.builder.position_at_end(bb);
        self.emit_stmt(body)
    }

    /// Evaluates `expr` and compares it against zero, for conditions.
    fn emit_truthy(&mut self, expr: &Expr) -> Result<IntValue<'ll>, BcCodegenError> {
        let value = self.emit_expr(expr)?;
        self.builder
            .build_int_compare(IntPredicate::NE, value, self.ctx.word_type().const_zero(), "truthy")
            .map_err(|e| BcCodegenError::Ice(e.to_string()))
    }

    fn emit_expr(&mut self, expr: &Expr) -> Result<IntValue<'ll>, BcCodegenError> {
        let word_ty = self.ctx.word_type();
        match expr {
            Expr::Number(n) => Ok(word_ty.const_int(*n as u64, true)),
            Expr::Str(bytes) => {
                let ptr = self
                    .ctx
                    .strings
                    .borrow_mut()
                    .intern(&self.ctx.ll_module, bytes, self.ctx.bytes_per_word() as u32);
                Ok(const_ptr_to_word(self.ctx, ptr))
            }
            Expr::Ident(name) => self.emit_ident_read(name),
            Expr::Deref(inner) => {
                let addr = self.emit_expr(inner)?;
                let ptr = word_to_ptr(self.ctx, &self.builder, addr)?;
                self.builder
                    .build_load(word_ty, ptr, "deref")
                    .map(|v| v.into_int_value())
                    .map_err(|e| BcCodegenError::Ice(e.to_string()))
            }
            Expr::AddrOf(inner) => self.emit_addr_of(inner),
            Expr::Neg(inner) => {
                let v = self.emit_expr(inner)?;
                self.builder.build_int_neg(v, "neg").map_err(|e| BcCodegenError::Ice(e.to_string()))
            }
            Expr::Not(inner) => {
                let v = self.emit_expr(inner)?;
                let is_zero = self
                    .builder
                    .build_int_compare(IntPredicate::EQ, v, word_ty.const_zero(), "not.cmp")
                    .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
                self.builder
                    .build_int_z_extend(is_zero, word_ty, "not")
                    .map_err(|e| BcCodegenError::Ice(e.to_string()))
            }
            Expr::Complement(inner) => {
                let v = self.emit_expr(inner)?;
                self.builder.build_not(v, "compl").map_err(|e| BcCodegenError::Ice(e.to_string()))
            }
            Expr::PreIncr(inner) => self.emit_incr_decr(inner, 1, true),
            Expr::PreDecr(inner) => self.emit_incr_decr(inner, -1, true),
            Expr::PostIncr(inner) => self.emit_incr_decr(inner, 1, false),
            Expr::PostDecr(inner) => self.emit_incr_decr(inner, -1, false),
            Expr::Binary { op, lhs, rhs } => {
                let l = self.emit_expr(lhs)?;
                let r = self.emit_expr(rhs)?;
                self.emit_binop(*op, l, r)
            }
            Expr::Assign { op, lhs, rhs } => self.emit_assign(*op, lhs, rhs),
            Expr::Ternary { cond, then_branch, else_branch } => self.emit_ternary(cond, then_branch, else_branch),
            Expr::Call { callee, args } => self.emit_call(callee, args),
            Expr::BytesPerWord => Ok(word_ty.const_int(self.ctx.bytes_per_word(), false)),
        }
    }

    /// Resolves and loads the word stored at `name`'s cell. A bare function
    /// name has no cell of its own: its value is its address, the same
    /// thing `&name` would give for data.
    fn emit_ident_read(&mut self, name: &str) -> Result<IntValue<'ll>, BcCodegenError> {
        match self.scope.resolve(name).map_err(BcCodegenError::from)? {
            bc_ast::Binding::Global(GlobalKind::Function) => {
                let func = self
                    .ctx
                    .get_function(name)
                    .ok_or_else(|| BcCodegenError::Ice(format!("function `{name}` not declared")))?;
                Ok(const_ptr_to_word(self.ctx, func.as_global_value().as_pointer_value()))
            }
            _ => {
                let ptr = self.cell_ptr(name)?;
                self.builder
                    .build_load(self.ctx.word_type(), ptr, "ident.load")
                    .map(|v| v.into_int_value())
                    .map_err(|e| BcCodegenError::Ice(e.to_string()))
            }
        }
    }

    fn cell_ptr(&self, name: &str) -> Result<PointerValue<'ll>, BcCodegenError> {
        match self.scope.resolve(name).map_err(BcCodegenError::from)? {
            bc_ast::Binding::Local => Ok(*self
                .locals
                .get(name)
                .expect("a local binding always has a corresponding alloca")),
            bc_ast::Binding::Global(GlobalKind::Data) => self
                .ctx
                .get_global(name)
                .map(|g| g.as_pointer_value())
                .ok_or_else(|| BcCodegenError::Ice(format!("global `{name}` not declared"))),
            bc_ast::Binding::Global(GlobalKind::Function) => Err(BcCodegenError::Semantic(format!(
                "`{name}` names a function and cannot be assigned to"
            ))),
        }
    }

    fn place_ref(&mut self, place: &Place) -> Result<PlaceRef<'ll>, BcCodegenError> {
        let ptr = match place {
            Place::Ident(name) => self.cell_ptr(name)?,
            Place::Deref(inner) => {
                let word = self.emit_expr(inner)?;
                word_to_ptr(self.ctx, &self.builder, word)?
            }
        };
        Ok(PlaceRef::new(ptr))
    }

    fn emit_addr_of(&mut self, inner: &Expr) -> Result<IntValue<'ll>, BcCodegenError> {
        // `&*e` cancels: the address of what `e` points to is just `e`.
        if let Expr::Deref(e) = inner {
            return self.emit_expr(e);
        }
        if let Expr::Ident(name) = inner {
            if let bc_ast::Binding::Global(GlobalKind::Function) =
                self.scope.resolve(name).map_err(BcCodegenError::from)?
            {
                let func = self
                    .ctx
                    .get_function(name)
                    .ok_or_else(|| BcCodegenError::Ice(format!("function `{name}` not declared")))?;
                return Ok(const_ptr_to_word(self.ctx, func.as_global_value().as_pointer_value()));
            }
        }
        let place = inner
            .as_place()
            .ok_or_else(|| BcCodegenError::Semantic("cannot take the address of a non-lvalue".into()))?;
        let ptr = self.place_ref(&place)?.ptr;
        ptr_to_word(self.ctx, &self.builder, ptr)
    }

    fn emit_incr_decr(&mut self, inner: &Expr, delta: i64, prefix: bool) -> Result<IntValue<'ll>, BcCodegenError> {
        let place = inner
            .as_place()
            .ok_or_else(|| BcCodegenError::Semantic("`++`/`--` requires an lvalue".into()))?;
        let ptr = self.place_ref(&place)?.ptr;
        let word_ty = self.ctx.word_type();
        let old = self
            .builder
            .build_load(word_ty, ptr, "incdec.old")
            .map(|v| v.into_int_value())
            .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
        let new = self
            .builder
            .build_int_add(old, word_ty.const_int(delta as u64, true), "incdec.new")
            .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
        self.builder.build_store(ptr, new).map_err(|e| BcCodegenError::Ice(e.to_string()))?;
        Ok(if prefix { new } else { old })
    }

    fn emit_binop(&mut self, op: BinOp, l: IntValue<'ll>, r: IntValue<'ll>) -> Result<IntValue<'ll>, BcCodegenError> {
        let word_ty = self.ctx.word_type();
        let b = &self.builder;
        let result = match op {
            BinOp::Add => b.build_int_add(l, r, "add"),
            BinOp::Sub => b.build_int_sub(l, r, "sub"),
            BinOp::Mul => b.build_int_mul(l, r, "mul"),
            BinOp::Div => b.build_int_signed_div(l, r, "div"),
            BinOp::Mod => b.build_int_signed_rem(l, r, "mod"),
            BinOp::Shl => b.build_left_shift(l, r, "shl"),
            BinOp::Shr => b.build_right_shift(l, r, true, "shr"),
            BinOp::And => b.build_and(l, r, "and"),
            BinOp::Or => b.build_or(l, r, "or"),
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let pred = match op {
                    BinOp::Eq => IntPredicate::EQ,
                    BinOp::Ne => IntPredicate::NE,
                    BinOp::Lt => IntPredicate::SLT,
                    BinOp::Le => IntPredicate::SLE,
                    BinOp::Gt => IntPredicate::SGT,
                    BinOp::Ge => IntPredicate::SGE,
                    _ => unreachable!(),
                };
                let cmp = b
                    .build_int_compare(pred, l, r, "cmp")
                    .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
                return b
                    .build_int_z_extend(cmp, word_ty, "cmp.ext")
                    .map_err(|e| BcCodegenError::Ice(e.to_string()));
            }
        };
        result.map_err(|e| BcCodegenError::Ice(e.to_string()))
    }

    fn emit_assign(&mut self, op: AssignOp, lhs: &Expr, rhs: &Expr) -> Result<IntValue<'ll>, BcCodegenError> {
        let place = lhs
            .as_place()
            .ok_or_else(|| BcCodegenError::Semantic("left side of assignment is not an lvalue".into()))?;
        let ptr = self.place_ref(&place)?.ptr;
        let new_value = match op {
            AssignOp::Assign => self.emit_expr(rhs)?,
            AssignOp::Compound(binop) => {
                let word_ty = self.ctx.word_type();
                let old = self
                    .builder
                    .build_load(word_ty, ptr, "assign.old")
                    .map(|v| v.into_int_value())
                    .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
                let rhs_val = self.emit_expr(rhs)?;
                self.emit_binop(binop, old, rhs_val)?
            }
        };
        self.builder.build_store(ptr, new_value).map_err(|e| BcCodegenError::Ice(e.to_string()))?;
        Ok(new_value)
    }

    fn emit_ternary(&mut self, cond: &Expr, then_branch: &Expr, else_branch: &Expr) -> Result<IntValue<'ll>, BcCodegenError> {
        let cond_val = self.emit_truthy(cond)?;
        let then_bb = self.ctx.ll_context.append_basic_block(self.function, "cond.then");
        let else_bb = self.ctx.ll_context.append_basic_block(self.function, "cond.else");
        let merge_bb = self.ctx.ll_context.append_basic_block(self.function, "cond.end");

        self.builder
            .build_conditional_branch(cond_val, then_bb, else_bb)
            .map_err(|e| BcCodegenError::Ice(e.to_string()))?;

        // Only the taken side's expression is ever evaluated (§15): each
        // side lives in its own block, reached only along its own edge.
        self.builder.position_at_end(then_bb);
        let then_val = self.emit_expr(then_branch)?;
        let then_end_bb = self.builder.get_insert_block().unwrap();
        self.builder
            .build_unconditional_branch(merge_bb)
            .map_err(|e| BcCodegenError::Ice(e.to_string()))?;

        self.builder.position_at_end(else_bb);
        let else_val = self.emit_expr(else_branch)?;
        let else_end_bb = self.builder.get_insert_block().unwrap();
        self.builder
            .build_unconditional_branch(merge_bb)
            .map_err(|e| BcCodegenError::Ice(e.to_string()))?;

        self.builder.position_at_end(merge_bb);
        let phi = self
            .builder
            .build_phi(self.ctx.word_type(), "cond.result")
            .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
        phi.add_incoming(&[(&then_val, then_end_bb), (&else_val, else_end_bb)]);
        Ok(phi.as_basic_value().into_int_value())
    }

    fn emit_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<IntValue<'ll>, BcCodegenError> {
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.emit_expr(arg)?.into());
        }

        if let Expr::Ident(name) = callee {
            if let bc_ast::Binding::Global(GlobalKind::Function) =
                self.scope.resolve(name).map_err(BcCodegenError::from)?
            {
                let func = self
                    .ctx
                    .get_function(name)
                    .ok_or_else(|| BcCodegenError::Ice(format!("function `{name}` not declared")))?;
                let call = self
                    .builder
                    .build_call(func, &arg_values, "call")
                    .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
                return call
                    .try_as_basic_value()
                    .left()
                    .map(|v| v.into_int_value())
                    .ok_or_else(|| BcCodegenError::Ice(format!("call to `{name}` produced no value")));
            }
        }

        // A computed callee: evaluate it to a word, bridge to a pointer, and
        // call through a signature shaped by this call site's own argument
        // count, matching a language with no function types to check.
        let callee_word = self.emit_expr(callee)?;
        let callee_ptr = word_to_ptr(self.ctx, &self.builder, callee_word)?;
        let word_ty = self.ctx.word_type();
        let param_tys = vec![word_ty.into(); args.len()];
        let fn_ty = word_ty.fn_type(&param_tys, false);
        let call = self
            .builder
            .build_indirect_call(fn_ty, callee_ptr, &arg_values, "icall")
            .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
        call.try_as_basic_value()
            .left()
            .map(|v| v.into_int_value())
            .ok_or_else(|| BcCodegenError::Ice("indirect call produced no value".into()))
    }
}
