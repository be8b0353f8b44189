use std::{
    collections::HashMap,
    io::{self, BufRead, Stdout, StdinLock, Write},
    rc::Rc,
};

use crate::{
    bytecode::{
        ir::FrameTemplate,
        op::{Instr, Op},
        verify::{VerifyError, verify_template},
    },
    lang::value::{Oid, Value},
    runtime::{
        frame::CallFrame,
        heap::Heap,
        runtime_error::{RuntimeError, RuntimeErrorKind},
    },
};

type OpResult<T = ()> = Result<T, RuntimeErrorKind>;

#[derive(Debug, Clone)]
pub struct VmConfig {
    pub max_call_depth: usize,
    pub max_steps: Option<usize>,
    pub max_stack_size: usize,
    /// Largest array `ALLOCA` will create.
    pub max_array_len: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_call_depth: 1000,
            max_steps: None,
            max_stack_size: 10_000,
            max_array_len: 1 << 24,
        }
    }
}

/// Stack machine that executes registered frame templates.
///
/// Reads `readln` input from `R` and writes program output (and the debug
/// trace) to `W`.
pub struct Vm<R = StdinLock<'static>, W = Stdout> {
    templates: HashMap<String, Rc<FrameTemplate>>,
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    heap: Heap,
    // Safety limits
    config: VmConfig,
    steps: usize,
    debug: bool,
    input: R,
    output: W,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Vm::with_io(config, io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Vm<R, W> {
    pub fn with_io(config: VmConfig, input: R, output: W) -> Self {
        Vm {
            templates: HashMap::new(),
            stack: Vec::new(),
            frames: Vec::new(),
            heap: Heap::new(),
            config,
            steps: 0,
            debug: false,
            input,
            output,
        }
    }

    /// Add a template, replacing any previous one with the same name.
    pub fn register(&mut self, template: FrameTemplate) -> Result<(), VerifyError> {
        verify_template(&template)?;
        tracing::debug!(
            function = %template.name,
            instrs = template.len(),
            "registered template"
        );
        self.templates
            .insert(template.name.clone(), Rc::new(template));
        Ok(())
    }

    pub fn set_debug(&mut self, on: bool) {
        self.debug = on;
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn reset_execution_state(&mut self) {
        self.steps = 0;
        self.stack.clear();
        self.frames.clear();
    }

    /// Execute `main` until its frame returns or runs past its last
    /// instruction.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        self.reset_execution_state();

        let main = self
            .templates
            .get("main")
            .cloned()
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::NoMain))?;

        tracing::debug!(templates = self.templates.len(), "running main");
        self.frames.push(CallFrame::new(main));

        let result = self.run_loop();
        self.output
            .flush()
            .map_err(|e| RuntimeError::new(RuntimeErrorKind::from(e)))?;
        result
    }

    // Execution

    fn run_loop(&mut self) -> Result<(), RuntimeError> {
        while let Some(frame) = self.frames.last_mut() {
            let template = Rc::clone(&frame.template);
            let pc = frame.pc;
            let Some(instr) = template.instrs.get(pc) else {
                break;
            };
            frame.pc += 1;

            self.step(&template.name, pc, instr)
                .map_err(|kind| RuntimeError::at(kind, &template.name, pc, instr))?;
        }
        Ok(())
    }

    fn step(&mut self, frame: &str, pc: usize, instr: &Instr) -> OpResult {
        self.trace(frame, pc, instr)?;
        self.check_steps()?;
        self.execute(&instr.op)?;
        self.check_stack()
    }

    fn trace(&mut self, frame: &str, pc: usize, instr: &Instr) -> OpResult {
        if !self.debug {
            return Ok(());
        }
        let top = match self.stack.last() {
            Some(value) => format!("{:?}", value),
            None => "<empty>".to_string(),
        };
        let text = instr.to_string();
        writeln!(self.output, "[{} {:04}] {:<28} top: {}", frame, pc, text, top)?;
        Ok(())
    }

    fn check_steps(&mut self) -> OpResult {
        self.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(RuntimeErrorKind::StepLimitExceeded(max));
            }
        }
        Ok(())
    }

    fn check_stack(&self) -> OpResult {
        if self.stack.len() > self.config.max_stack_size {
            return Err(RuntimeErrorKind::StackOverflow(self.config.max_stack_size));
        }
        Ok(())
    }

    fn frame_mut(&mut self) -> OpResult<&mut CallFrame> {
        self.frames
            .last_mut()
            .ok_or(RuntimeErrorKind::NoActiveFrame)
    }

    fn execute(&mut self, op: &Op) -> OpResult {
        match op {
            // Literals and slots
            Op::Push(value) => self.push(value.clone()),
            Op::Pop => {
                self.pop()?;
            }
            Op::Dup => {
                let top = self
                    .stack
                    .last()
                    .cloned()
                    .ok_or(RuntimeErrorKind::StackUnderflow)?;
                self.push(top);
            }
            Op::Nop => {}
            Op::Load(slot) => {
                let value = self.frame_mut()?.load(*slot)?;
                self.push(value);
            }
            Op::Store(slot) => {
                let value = self.pop()?;
                self.frame_mut()?.store(*slot, value);
            }

            // Arithmetic
            Op::Add | Op::Sub | Op::Mul | Op::Div => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                let result = arithmetic(op, lhs, rhs)?;
                self.push(result);
            }

            // Logic
            Op::And | Op::Or => {
                let rhs = self.pop_bool(op)?;
                let lhs = self.pop_bool(op)?;
                let result = if matches!(op, Op::And) {
                    lhs && rhs
                } else {
                    lhs || rhs
                };
                self.push(Value::Bool(result));
            }
            Op::Not => {
                let value = self.pop_bool(op)?;
                self.push(Value::Bool(!value));
            }

            // Comparison
            Op::CmpEq | Op::CmpNe => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                let equal = lhs == rhs;
                self.push(Value::Bool(if matches!(op, Op::CmpEq) {
                    equal
                } else {
                    !equal
                }));
            }
            Op::CmpLt | Op::CmpLe => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                let ordering = compare(op, &lhs, &rhs)?;
                let result = if matches!(op, Op::CmpLt) {
                    ordering.is_lt()
                } else {
                    ordering.is_le()
                };
                self.push(Value::Bool(result));
            }

            // Control flow
            Op::Jmp(target) => self.jump(*target)?,
            Op::Jmpf(target) => {
                if !self.pop_bool(op)? {
                    self.jump(*target)?;
                }
            }
            Op::Call(name) => self.call(name)?,
            Op::Ret => self.ret(),

            // Heap
            Op::Allocs => {
                let oid = self.heap.alloc_struct();
                self.push(Value::Ref(oid));
            }
            Op::Setf(field) => {
                let value = self.pop()?;
                let oid = self.pop_ref(op)?;
                self.heap.struct_mut(oid)?.insert(field.clone(), value);
            }
            Op::Getf(field) => {
                let oid = self.pop_ref(op)?;
                let value = self
                    .heap
                    .get_struct(oid)?
                    .get(field)
                    .cloned()
                    .ok_or_else(|| RuntimeErrorKind::MissingField(field.clone()))?;
                self.push(value);
            }
            Op::Alloca => {
                let size = self.pop_int(op)?;
                let len =
                    usize::try_from(size).map_err(|_| RuntimeErrorKind::NegativeArraySize(size))?;
                if len > self.config.max_array_len {
                    return Err(RuntimeErrorKind::ArrayTooLarge {
                        len,
                        max: self.config.max_array_len,
                    });
                }
                let oid = self.heap.alloc_array(len)?;
                self.push(Value::Ref(oid));
            }
            Op::Seti => {
                let value = self.pop()?;
                let index = self.pop_int(op)?;
                let oid = self.pop_ref(op)?;
                let array = self.heap.array_mut(oid)?;
                let i = checked_index("SETI", index, array.len())?;
                array[i] = value;
            }
            Op::Geti => {
                let index = self.pop_int(op)?;
                let oid = self.pop_ref(op)?;
                let array = self.heap.array(oid)?;
                let i = checked_index("GETI", index, array.len())?;
                let value = array[i].clone();
                self.push(value);
            }

            // I/O and built-ins
            Op::Write => {
                let value = self.pop()?;
                write!(self.output, "{}", value)?;
            }
            Op::Read => {
                let value = self.read_line()?;
                self.push(value);
            }
            Op::Len => {
                let len = match self.pop()? {
                    Value::Str(s) => s.chars().count(),
                    Value::Ref(oid) => self.heap.array(oid)?.len(),
                    Value::Null => return Err(RuntimeErrorKind::NullValue { op: "LEN" }),
                    other => return Err(mismatch(op, "a string or an array", &other)),
                };
                self.push(Value::Int(len as i32));
            }
            Op::Getc => {
                let index = self.pop_int(op)?;
                let value = match self.pop()? {
                    Value::Str(s) => {
                        let len = s.chars().count();
                        let i = checked_index("GETC", index, len)?;
                        s.chars()
                            .nth(i)
                            .map(|c| Value::Str(c.to_string()))
                            .ok_or(RuntimeErrorKind::IndexOutOfBounds {
                                op: "GETC",
                                index,
                                len,
                            })?
                    }
                    Value::Ref(oid) => {
                        let array = self.heap.array(oid)?;
                        let i = checked_index("GETC", index, array.len())?;
                        array[i].clone()
                    }
                    Value::Null => return Err(RuntimeErrorKind::NullValue { op: "GETC" }),
                    other => return Err(mismatch(op, "a string or an array", &other)),
                };
                self.push(value);
            }
            Op::ToInt | Op::ToDbl | Op::ToStr => {
                let value = self.pop()?;
                let converted = convert(op, value)?;
                self.push(converted);
            }
        }
        Ok(())
    }

    fn jump(&mut self, target: i32) -> OpResult {
        let target = usize::try_from(target).map_err(|_| RuntimeErrorKind::BadJump(target))?;
        self.frame_mut()?.pc = target;
        Ok(())
    }

    /// Arguments stay on the operand stack; the callee stores them.
    fn call(&mut self, name: &str) -> OpResult {
        let template = self
            .templates
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeErrorKind::UnresolvedCall(name.to_string()))?;

        if self.frames.len() >= self.config.max_call_depth {
            return Err(RuntimeErrorKind::CallDepthExceeded(self.config.max_call_depth));
        }

        tracing::trace!(function = name, depth = self.frames.len() + 1, "call");
        self.frames.push(CallFrame::new(template));
        Ok(())
    }

    fn ret(&mut self) {
        let value = self.stack.pop().unwrap_or(Value::Null);
        if let Some(frame) = self.frames.pop() {
            tracing::trace!(function = frame.name(), "return");
        }
        if !self.frames.is_empty() {
            self.push(value);
        }
    }

    fn read_line(&mut self) -> OpResult<Value> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(Value::Null);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Value::Str(line))
    }

    // Stack operations

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> OpResult<Value> {
        self.stack.pop().ok_or(RuntimeErrorKind::StackUnderflow)
    }

    fn pop_int(&mut self, op: &Op) -> OpResult<i32> {
        match self.pop()? {
            Value::Int(n) => Ok(n),
            Value::Null => Err(RuntimeErrorKind::NullValue { op: op.mnemonic() }),
            other => Err(mismatch(op, "an int", &other)),
        }
    }

    fn pop_bool(&mut self, op: &Op) -> OpResult<bool> {
        match self.pop()? {
            Value::Bool(b) => Ok(b),
            Value::Null => Err(RuntimeErrorKind::NullValue { op: op.mnemonic() }),
            other => Err(mismatch(op, "a bool", &other)),
        }
    }

    fn pop_ref(&mut self, op: &Op) -> OpResult<Oid> {
        match self.pop()? {
            Value::Ref(oid) => Ok(oid),
            Value::Null => Err(RuntimeErrorKind::NullValue { op: op.mnemonic() }),
            other => Err(mismatch(op, "an object", &other)),
        }
    }
}

fn mismatch(op: &Op, expected: &'static str, found: &Value) -> RuntimeErrorKind {
    RuntimeErrorKind::TypeMismatch {
        op: op.mnemonic(),
        expected,
        found: found.type_name().to_string(),
    }
}

fn mismatch_pair(op: &Op, expected: &'static str, lhs: &Value, rhs: &Value) -> RuntimeErrorKind {
    RuntimeErrorKind::TypeMismatch {
        op: op.mnemonic(),
        expected,
        found: format!("{} and {}", lhs.type_name(), rhs.type_name()),
    }
}

fn checked_index(op: &'static str, index: i32, len: usize) -> OpResult<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or(RuntimeErrorKind::IndexOutOfBounds { op, index, len })
}

/// `Add`, `Sub`, `Mul` and `Div` over two operands of the same type.
fn arithmetic(op: &Op, lhs: Value, rhs: Value) -> OpResult<Value> {
    let result = match (op, lhs, rhs) {
        (_, Value::Null, _) | (_, _, Value::Null) => {
            return Err(RuntimeErrorKind::NullValue { op: op.mnemonic() });
        }

        (Op::Add, Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
        (Op::Sub, Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_sub(b)),
        (Op::Mul, Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_mul(b)),
        (Op::Div, Value::Int(_), Value::Int(0)) => return Err(RuntimeErrorKind::DivisionByZero),
        (Op::Div, Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_div(b)),

        (Op::Div, Value::Double(_), Value::Double(b)) if b == 0.0 => {
            return Err(RuntimeErrorKind::DivisionByZero);
        }
        (Op::Add, Value::Double(a), Value::Double(b)) => Value::Double(a + b),
        (Op::Sub, Value::Double(a), Value::Double(b)) => Value::Double(a - b),
        (Op::Mul, Value::Double(a), Value::Double(b)) => Value::Double(a * b),
        (Op::Div, Value::Double(a), Value::Double(b)) => Value::Double(a / b),

        (Op::Add, Value::Str(a), Value::Str(b)) => Value::Str(a + &b),

        (_, lhs, rhs) => {
            let expected = if matches!(op, Op::Add) {
                "two ints, two doubles or two strings"
            } else {
                "two ints or two doubles"
            };
            return Err(mismatch_pair(op, expected, &lhs, &rhs));
        }
    };
    Ok(result)
}

fn compare(op: &Op, lhs: &Value, rhs: &Value) -> OpResult<std::cmp::Ordering> {
    match (lhs, rhs) {
        (Value::Null, _) | (_, Value::Null) => {
            Err(RuntimeErrorKind::NullValue { op: op.mnemonic() })
        }
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        // NaN compares as neither less nor equal.
        (Value::Double(a), Value::Double(b)) => {
            Ok(a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Greater))
        }
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => Err(mismatch_pair(
            op,
            "two ints, two doubles or two strings",
            lhs,
            rhs,
        )),
    }
}

/// `ToInt`, `ToDbl` and `ToStr`.
fn convert(op: &Op, value: Value) -> OpResult<Value> {
    if value.is_null() {
        return Err(RuntimeErrorKind::NullValue { op: op.mnemonic() });
    }
    let converted = match (op, value) {
        (Op::ToInt, Value::Int(n)) => Value::Int(n),
        (Op::ToInt, Value::Double(d)) => Value::Int(d.floor() as i32),
        (Op::ToInt, Value::Str(s)) => match s.parse::<i32>() {
            Ok(n) => Value::Int(n),
            Err(_) => {
                return Err(RuntimeErrorKind::BadConversion {
                    value: s,
                    target: "int",
                });
            }
        },

        (Op::ToDbl, Value::Double(d)) => Value::Double(d),
        (Op::ToDbl, Value::Int(n)) => Value::Double(n as f64),
        (Op::ToDbl, Value::Str(s)) => match s.parse::<f64>() {
            Ok(d) => Value::Double(d),
            Err(_) => {
                return Err(RuntimeErrorKind::BadConversion {
                    value: s,
                    target: "double",
                });
            }
        },

        (Op::ToStr, Value::Ref(_)) => {
            return Err(RuntimeErrorKind::TypeMismatch {
                op: "TOSTR",
                expected: "a scalar",
                found: "object".to_string(),
            });
        }
        (Op::ToStr, scalar) => Value::Str(scalar.to_string()),

        (_, other) => {
            return Err(mismatch(op, "an int, a double or a string", &other));
        }
    };
    Ok(converted)
}
