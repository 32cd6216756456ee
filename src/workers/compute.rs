//! Built-in `compute` worker program.
//!
//! Messages:
//! - `COMPUTE {operation, value}` → `{operation, input, output, taskNumber}`
//! - `PING` → `{pong: true, worker}`
//!
//! `taskNumber` counts the COMPUTE tasks this worker has processed, starting
//! at 1.

use serde_json::{json, Value};

use crate::workers::program::{TaskContext, WorkerProgram};
use crate::workers::protocol::WorkerRequest;

pub struct ComputeProgram {
    worker: String,
    tasks: u64,
}

impl ComputeProgram {
    pub fn new(worker: &str) -> Self {
        Self {
            worker: worker.to_string(),
            tasks: 0,
        }
    }

    fn compute(&mut self, payload: &Value, ctx: &TaskContext<'_>) -> Result<Value, String> {
        let operation = payload
            .get("operation")
            .and_then(Value::as_str)
            .ok_or("Missing operation")?;
        let input = payload.get("value").cloned().unwrap_or(Value::Null);

        let output = match operation {
            "square" => arithmetic(&input, |n| n.checked_mul(n), |x| x * x)?,
            "double" => arithmetic(&input, |n| n.checked_mul(2), |x| x * 2.0)?,
            "sqrt" => {
                let x = input.as_f64().ok_or("Value must be a number")?;
                if x < 0.0 {
                    return Err("Cannot take the square root of a negative number".into());
                }
                json!(x.sqrt())
            }
            "factorial" => json!(factorial(natural(&input)?, ctx)?),
            "fibonacci" => json!(fibonacci(natural(&input)?, ctx)?),
            other => return Err(format!("Unknown operation: {}", other)),
        };

        self.tasks += 1;
        Ok(json!({
            "operation": operation,
            "input": input,
            "output": output,
            "taskNumber": self.tasks,
        }))
    }
}

impl WorkerProgram for ComputeProgram {
    fn handle(&mut self, request: &WorkerRequest, ctx: &TaskContext<'_>) -> Option<Result<Value, String>> {
        let outcome = match request.kind.as_str() {
            "COMPUTE" => self.compute(&request.payload, ctx),
            "PING" => Ok(json!({ "pong": true, "worker": self.worker })),
            other => Err(format!("Unknown message type: {}", other)),
        };
        Some(outcome)
    }
}

/// Integers stay integers; anything else is computed as f64.
fn arithmetic(
    input: &Value,
    int_op: impl Fn(i64) -> Option<i64>,
    float_op: impl Fn(f64) -> f64,
) -> Result<Value, String> {
    if let Some(n) = input.as_i64() {
        return int_op(n)
            .map(Value::from)
            .ok_or_else(|| "Result overflows".to_string());
    }
    let x = input.as_f64().ok_or("Value must be a number")?;
    Ok(json!(float_op(x)))
}

fn natural(input: &Value) -> Result<u64, String> {
    input
        .as_u64()
        .ok_or_else(|| "Value must be a non-negative integer".to_string())
}

fn factorial(n: u64, ctx: &TaskContext<'_>) -> Result<u64, String> {
    let mut acc: u64 = 1;
    for i in 2..=n {
        if ctx.is_cancelled() {
            return Err("Cancelled".into());
        }
        acc = acc.checked_mul(i).ok_or("Result overflows")?;
    }
    Ok(acc)
}

fn fibonacci(n: u64, ctx: &TaskContext<'_>) -> Result<u64, String> {
    let (mut a, mut b): (u64, u64) = (0, 1);
    for _ in 0..n {
        if ctx.is_cancelled() {
            return Err("Cancelled".into());
        }
        let next = a.checked_add(b).ok_or("Result overflows")?;
        a = b;
        b = next;
    }
    Ok(a)
}
