//! Script execution.
//!
//! The emulator does not interpret a real smart contract language. A [`Runtime`] receives the
//! raw script together with its decoded arguments and mutates the ledger. [`BuiltinRuntime`]
//! understands a small set of line-oriented fixture operations:
//!
//! ```text
//! // comments are skipped
//! transfer 10.0 0x01cf0e2f2f715450
//! ```
//!
//! The first token names the operation. Remaining tokens are literal operands and are followed
//! by the transaction or script arguments.

use crate::Ledger;
use auto_impl::auto_impl;
use flow_harness_primitives::{Address, Composite, ExecutionError, UFix64, Value};
use flow_harness_wallets::{AccountKey, HashAlgorithm, PublicKey, SignatureAlgorithm};

/// What a script is invoked with.
#[derive(Clone, Debug)]
pub struct Invocation<'a> {
    /// Raw script source.
    pub script: &'a [u8],
    /// Decoded arguments.
    pub arguments: Vec<Value>,
    /// Authorizing accounts, empty for read-only scripts.
    pub authorizers: &'a [Address],
    /// The chain's service account.
    pub service_address: Address,
}

/// Side effects of a successful transaction besides ledger writes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Output {
    /// Emitted events in order.
    pub events: Vec<Composite>,
    /// Log lines.
    pub logs: Vec<String>,
}

/// Executes transactions and scripts against a [`Ledger`].
#[auto_impl(&, Box, Arc)]
pub trait Runtime: Send + Sync {
    /// Runs a transaction. The ledger is a scratch copy that is discarded on error.
    fn execute_transaction(
        &self,
        invocation: &Invocation<'_>,
        ledger: &mut Ledger,
    ) -> Result<Output, ExecutionError>;

    /// Runs a read-only script.
    fn execute_script(
        &self,
        invocation: &Invocation<'_>,
        ledger: &Ledger,
    ) -> Result<Value, ExecutionError>;
}

/// The fixture runtime.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinRuntime;

impl Runtime for BuiltinRuntime {
    fn execute_transaction(
        &self,
        invocation: &Invocation<'_>,
        ledger: &mut Ledger,
    ) -> Result<Output, ExecutionError> {
        let (op, args) = parse(invocation)?;
        trace!(target: "emulator::runtime", %op, args = args.values.len(), "executing transaction");
        let mut output = Output::default();
        match op.as_str() {
            "noop" => {}
            "revert" => return Err(args.revert()),
            "log" => output.logs.extend(args.values.iter().map(ToString::to_string)),
            "create_account" => {
                let payer = args.authorizer(invocation, 0)?;
                let hash_algorithm = match args.values.get(1) {
                    None => HashAlgorithm::default(),
                    Some(value) => {
                        value.as_str().and_then(HashAlgorithm::from_name).ok_or_else(|| {
                            ExecutionError::runtime(format!(
                                "create_account: unsupported hash algorithm {value}"
                            ))
                        })?
                    }
                };
                let signature_algorithm = match args.values.get(2) {
                    None => SignatureAlgorithm::default(),
                    Some(value) => {
                        value.as_str().and_then(SignatureAlgorithm::from_name).ok_or_else(|| {
                            ExecutionError::runtime(format!(
                                "create_account: unsupported signature algorithm {value}"
                            ))
                        })?
                    }
                };
                let public_key = PublicKey::from_hex(args.string(0)?, signature_algorithm)
                    .map_err(|err| ExecutionError::runtime(format!("create_account: {err}")))?;
                let address =
                    ledger.create_account(vec![AccountKey::new(public_key, hash_algorithm)]);
                debug!(target: "emulator::runtime", %payer, %address, "account created");
                output.events.push(Composite::new(
                    "flow.AccountCreated",
                    vec![("address".to_string(), Value::Address(address))],
                ));
            }
            "transfer" => {
                let amount = args.ufix64(0)?;
                let to = args.address(1)?;
                let from = args.authorizer(invocation, 0)?;
                withdraw(ledger, &from, amount)?;
                deposit(ledger, &to, amount)?;
                output.events.push(Composite::new(
                    "flow.TokensTransferred",
                    vec![
                        ("amount".to_string(), Value::UFix64(amount)),
                        ("from".to_string(), Value::Address(from)),
                        ("to".to_string(), Value::Address(to)),
                    ],
                ));
            }
            "mint" => {
                let amount = args.ufix64(0)?;
                let to = args.address(1)?;
                if !invocation.authorizers.contains(&invocation.service_address) {
                    return Err(ExecutionError::runtime(
                        "mint: must be authorized by the service account",
                    ));
                }
                deposit(ledger, &to, amount)?;
                output.events.push(Composite::new(
                    "flow.TokensMinted",
                    vec![
                        ("amount".to_string(), Value::UFix64(amount)),
                        ("to".to_string(), Value::Address(to)),
                    ],
                ));
            }
            "deploy_contract" => {
                let name = args.string(0)?;
                let code = args.string(1)?;
                let address = args.authorizer(invocation, 0)?;
                let account = account_mut(ledger, &address)?;
                if account.contracts.contains_key(name) {
                    return Err(ExecutionError::runtime(format!(
                        "deploy_contract: contract {name} already exists on {address}"
                    )));
                }
                account.contracts.insert(name.to_string(), code.as_bytes().to_vec().into());
                output.events.push(Composite::new(
                    "flow.AccountContractAdded",
                    vec![
                        ("address".to_string(), Value::Address(address)),
                        ("contract".to_string(), Value::String(name.to_string())),
                    ],
                ));
            }
            other => return Err(unknown_operation(other)),
        }
        Ok(output)
    }

    fn execute_script(
        &self,
        invocation: &Invocation<'_>,
        ledger: &Ledger,
    ) -> Result<Value, ExecutionError> {
        let (op, args) = parse(invocation)?;
        trace!(target: "emulator::runtime", %op, args = args.values.len(), "executing script");
        match op.as_str() {
            "balance" => {
                let address = args.address(0)?;
                let account = ledger.account(&address).ok_or_else(|| {
                    ExecutionError::runtime(format!("account {address} not found"))
                })?;
                Ok(Value::UFix64(account.balance))
            }
            "contract_names" => {
                let address = args.address(0)?;
                let account = ledger.account(&address).ok_or_else(|| {
                    ExecutionError::runtime(format!("account {address} not found"))
                })?;
                Ok(Value::Array(account.contract_names().map(Value::from).collect()))
            }
            "echo" => Ok(args.values.first().cloned().unwrap_or_default()),
            "revert" => Err(args.revert()),
            other => Err(unknown_operation(other)),
        }
    }
}

struct Args {
    op: String,
    values: Vec<Value>,
}

impl Args {
    fn get(&self, index: usize, expected: &str) -> Result<&Value, ExecutionError> {
        self.values.get(index).ok_or_else(|| {
            ExecutionError::runtime(format!(
                "{}: missing {expected} argument at position {index}",
                self.op
            ))
        })
    }

    fn mismatch(&self, index: usize, expected: &str, actual: &Value) -> ExecutionError {
        ExecutionError::runtime(format!(
            "{}: expected {expected} at position {index}, got {}",
            self.op,
            actual.type_name()
        ))
    }

    fn address(&self, index: usize) -> Result<Address, ExecutionError> {
        let value = self.get(index, "Address")?;
        value.as_address().ok_or_else(|| self.mismatch(index, "Address", value))
    }

    fn ufix64(&self, index: usize) -> Result<UFix64, ExecutionError> {
        let value = self.get(index, "UFix64")?;
        value.as_ufix64().ok_or_else(|| self.mismatch(index, "UFix64", value))
    }

    fn string(&self, index: usize) -> Result<&str, ExecutionError> {
        let value = self.get(index, "String")?;
        value.as_str().ok_or_else(|| self.mismatch(index, "String", value))
    }

    fn authorizer(
        &self,
        invocation: &Invocation<'_>,
        index: usize,
    ) -> Result<Address, ExecutionError> {
        invocation.authorizers.get(index).copied().ok_or_else(|| {
            ExecutionError::new(
                ExecutionError::ACCOUNT_AUTHORIZATION,
                format!("{}: requires at least {} authorizer(s)", self.op, index + 1),
            )
        })
    }

    fn revert(&self) -> ExecutionError {
        match self.values.first() {
            Some(Value::String(message)) => ExecutionError::runtime(message.clone()),
            Some(value) => ExecutionError::runtime(value.to_string()),
            None => ExecutionError::runtime("reverted"),
        }
    }
}

fn unknown_operation(op: &str) -> ExecutionError {
    ExecutionError::runtime(format!("unknown operation `{op}`"))
}

fn account_mut<'a>(
    ledger: &'a mut Ledger,
    address: &Address,
) -> Result<&'a mut crate::Account, ExecutionError> {
    ledger
        .account_mut(address)
        .ok_or_else(|| ExecutionError::runtime(format!("account {address} not found")))
}

fn withdraw(ledger: &mut Ledger, from: &Address, amount: UFix64) -> Result<(), ExecutionError> {
    let account = account_mut(ledger, from)?;
    account.balance = account.balance.checked_sub(amount).ok_or_else(|| {
        ExecutionError::runtime(format!(
            "insufficient balance: {from} holds {}, requested {amount}",
            account.balance
        ))
    })?;
    Ok(())
}

fn deposit(ledger: &mut Ledger, to: &Address, amount: UFix64) -> Result<(), ExecutionError> {
    let account = account_mut(ledger, to)?;
    account.balance = account
        .balance
        .checked_add(amount)
        .ok_or_else(|| ExecutionError::runtime(format!("balance of {to} overflows")))?;
    Ok(())
}

fn parse(invocation: &Invocation<'_>) -> Result<(String, Args), ExecutionError> {
    let source = std::str::from_utf8(invocation.script)
        .map_err(|_| ExecutionError::runtime("script is not valid UTF-8"))?;
    let mut tokens = source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("//"))
        .flat_map(tokenize)
        .collect::<Vec<_>>()
        .into_iter();

    let op = match tokens.next() {
        Some(Token::Bare(op)) => op,
        Some(Token::Quoted(op)) => return Err(unknown_operation(&op)),
        None => return Err(ExecutionError::runtime("script has no operation")),
    };
    let mut values = tokens.map(literal).collect::<Result<Vec<_>, _>>()?;
    values.extend(invocation.arguments.iter().cloned());
    Ok((op.clone(), Args { op, values }))
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Bare(String),
    Quoted(String),
}

/// Splits a line on whitespace, keeping double quoted strings together.
fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut quoted = String::new();
            while let Some(c) = chars.next() {
                match c {
                    '"' => break,
                    '\\' => quoted.extend(chars.next()),
                    c => quoted.push(c),
                }
            }
            tokens.push(Token::Quoted(quoted));
        } else {
            let mut bare = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                bare.push(c);
                chars.next();
            }
            tokens.push(Token::Bare(bare));
        }
    }
    tokens
}

fn invalid_literal(literal: &str, err: impl std::fmt::Display) -> ExecutionError {
    ExecutionError::runtime(format!("invalid literal `{literal}`: {err}"))
}

fn literal(token: Token) -> Result<Value, ExecutionError> {
    let bare = match token {
        Token::Quoted(s) => return Ok(Value::String(s)),
        Token::Bare(bare) => bare,
    };
    let value = match bare.as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        s if s.starts_with("0x") => {
            Value::Address(s.parse().map_err(|err| invalid_literal(s, err))?)
        }
        s if s.contains('.') && s.starts_with(|c: char| c.is_ascii_digit()) => {
            Value::UFix64(s.parse().map_err(|err| invalid_literal(s, err))?)
        }
        s => match s.parse::<u64>() {
            Ok(n) if s.bytes().all(|b| b.is_ascii_digit()) => Value::UInt64(n),
            _ => Value::String(bare),
        },
    };
    Ok(value)
}
