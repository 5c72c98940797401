//! Contract deployment
//!
//! The init list always starts with `_scilla_version`, then `_extlibs` when
//! user libraries are linked, then one entry per constructor parameter in
//! declaration order.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::binding::encode::{encode_args, split_call_args, AdtValue, EncodedValue, ParamValue};
use crate::binding::ScillaContract;
use crate::cache::{content_hash, ContractInfo};
use crate::chain::{ChainClient, ContractHandle, Transaction, TxOverrides};
use crate::compiler::SexpCompiler;
use crate::context::ScillaContext;
use crate::model::Field;
use crate::parser::parse_scilla;
use crate::{Error, Result};

/// A deployed library linked into a contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDefinedLibrary {
    pub name: String,
    pub address: String,
}

impl UserDefinedLibrary {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

fn version_entry() -> ParamValue {
    ParamValue {
        vname: "_scilla_version".into(),
        ty: "Uint32".into(),
        value: EncodedValue::Scalar("0".into()),
    }
}

/// Init list for a contract deployment
///
/// # Errors
/// `CallShape` when `args` does not match the constructor parameters; a
/// contract without parameters accepts no arguments at all.
pub fn fill_init(
    contract_name: &str,
    libraries: Option<&[UserDefinedLibrary]>,
    constructor_params: Option<&[Field]>,
    args: &[Value],
) -> Result<Vec<ParamValue>> {
    let mut init = vec![version_entry()];

    if let Some(libraries) = libraries {
        init.push(ParamValue {
            vname: "_extlibs".into(),
            ty: "List (Pair String ByStr20)".into(),
            value: EncodedValue::List(
                libraries
                    .iter()
                    .map(|lib| {
                        EncodedValue::Adt(AdtValue {
                            constructor: "Pair".into(),
                            argtypes: vec!["String".into(), "ByStr20".into()],
                            arguments: vec![
                                EncodedValue::Scalar(lib.name.clone()),
                                EncodedValue::Scalar(lib.address.clone()),
                            ],
                        })
                    })
                    .collect(),
            ),
        });
    }

    let target = format!("{} deployment", contract_name);
    init.extend(encode_args(&target, constructor_params.unwrap_or_default(), args)?);
    Ok(init)
}

/// Init list for a library deployment
pub fn fill_library_init() -> Vec<ParamValue> {
    vec![
        version_entry(),
        ParamValue {
            vname: "_library".into(),
            ty: "Bool".into(),
            value: EncodedValue::Adt(AdtValue {
                constructor: "True".into(),
                argtypes: vec![],
                arguments: vec![],
            }),
        },
    ]
}

/// Strip `(* ... *)` comments, trailing whitespace and the lines left empty
///
/// Comments nest. Text inside string literals is left alone.
pub fn compress_contract(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    let mut out = String::with_capacity(code.len());
    let mut depth = 0usize;
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(n) = next {
                    out.push(n);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '(' && next == Some('*') {
            depth += 1;
            i += 1;
        } else if depth > 0 {
            if c == '*' && next == Some(')') {
                depth -= 1;
                i += 1;
            } else if c == '\n' {
                // keep line structure so multi-line comments leave empty lines behind
                out.push(c);
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
        i += 1;
    }

    out.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

impl<C: ChainClient> ScillaContext<C> {
    /// Deploy a contract from the cache by name
    ///
    /// With `n` constructor parameters, `n + 1` arguments means the last one
    /// is a transaction override object.
    pub fn deploy(
        &self,
        name: &str,
        libraries: Option<&[UserDefinedLibrary]>,
        compress: bool,
        args: Vec<Value>,
    ) -> Result<ScillaContract> {
        let expected = self
            .contract_info(name)?
            .parsed_contract
            .constructor_params
            .as_ref()
            .map(Vec::len);

        let (args, overrides) = match expected {
            Some(n) => split_call_args(&format!("{} deployment", name), n, args)?,
            None => (args, None),
        };
        self.deploy_with(name, libraries, compress, args, overrides.as_ref())
    }

    /// Like `deploy`, with explicit overrides; `args` must match the constructor exactly
    pub fn deploy_with(
        &self,
        name: &str,
        libraries: Option<&[UserDefinedLibrary]>,
        compress: bool,
        args: Vec<Value>,
        overrides: Option<&TxOverrides>,
    ) -> Result<ScillaContract> {
        let info = self.contract_info(name)?.clone();
        let params = info.parsed_contract.constructor_params.as_deref();
        let init = fill_init(name, libraries, params, &args)?;

        let code = read_code(Path::new(&info.path), compress)?;
        let (tx, handle) = self.deploy_code(&code, &init, overrides)?;
        info!(contract = %name, address = %handle.address, "deployed");
        Ok(self.bind_deployed(info, handle, tx))
    }

    /// Deploy a library from the cache by name
    pub fn deploy_library(&self, name: &str) -> Result<ScillaContract> {
        let info = self.contract_info(name)?.clone();
        let code = read_code(Path::new(&info.path), false)?;
        let (tx, handle) = self.deploy_code(&code, &fill_library_init(), None)?;
        info!(library = %name, address = %handle.address, "deployed");
        Ok(self.bind_deployed(info, handle, tx))
    }

    /// Deploy the source at `path` with a prepared init list
    pub fn deploy_from_file(
        &self,
        path: &Path,
        init: &[ParamValue],
        overrides: Option<&TxOverrides>,
    ) -> Result<(Transaction, ContractHandle)> {
        let code = read_code(path, false)?;
        self.deploy_code(&code, init, overrides)
    }

    fn deploy_code(
        &self,
        code: &str,
        init: &[ParamValue],
        overrides: Option<&TxOverrides>,
    ) -> Result<(Transaction, ContractHandle)> {
        let mut params = self.setup().call_params();
        params.pub_key = self.default_sender().map(str::to_string);
        if let Some(overrides) = overrides {
            overrides.apply(&mut params);
        }
        debug!(init_entries = init.len(), "deploying");
        self.client().deploy(code, init, &params, self.setup().retry())
    }

    fn bind_deployed(&self, info: ContractInfo, handle: ContractHandle, tx: Transaction) -> ScillaContract {
        let mut contract = ScillaContract::bind(info, handle).with_deployment(tx);
        if let Some(sender) = self.default_sender() {
            contract.connect(sender);
        }
        contract
    }

    /// Bind a contract already on chain by fetching and parsing its code
    ///
    /// Returns `None` when nothing is deployed at `address`.
    pub fn contract_from_address(
        &self,
        address: &str,
        compiler: &dyn SexpCompiler,
    ) -> Result<Option<ScillaContract>> {
        let Some(code) = self.client().get_code(address)? else {
            return Ok(None);
        };

        let mut file = tempfile::Builder::new()
            .prefix("contract")
            .suffix(".scilla")
            .tempfile()
            .map_err(|e| Error::io(std::env::temp_dir(), e))?;
        file.write_all(code.as_bytes())
            .map_err(|e| Error::io(file.path(), e))?;
        let parsed_contract = parse_scilla(file.path(), compiler)?;

        let info = ContractInfo {
            content_hash: content_hash(code.as_bytes()),
            path: address.to_string(),
            parsed_contract,
        };
        let mut contract = ScillaContract::bind(info, ContractHandle::new(address));
        if let Some(sender) = self.default_sender() {
            contract.connect(sender);
        }
        Ok(Some(contract))
    }

    pub fn deployer(&self) -> ContractDeployer<'_, C> {
        ContractDeployer::new(self)
    }
}

fn read_code(path: &Path, compress: bool) -> Result<String> {
    let code = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(if compress { compress_contract(&code) } else { code })
}

/// Step-by-step deployment request
///
/// Every setting goes back to its default after `deploy`, whatever the outcome.
pub struct ContractDeployer<'a, C> {
    ctx: &'a ScillaContext<C>,
    name: String,
    compress: bool,
    libraries: Option<Vec<UserDefinedLibrary>>,
    tx_params: Option<TxOverrides>,
    params: Vec<Value>,
}

impl<'a, C: ChainClient> ContractDeployer<'a, C> {
    pub fn new(ctx: &'a ScillaContext<C>) -> Self {
        Self {
            ctx,
            name: String::new(),
            compress: false,
            libraries: None,
            tx_params: None,
            params: vec![],
        }
    }

    pub fn reset(&mut self) -> &mut Self {
        self.name.clear();
        self.compress = false;
        self.libraries = None;
        self.tx_params = None;
        self.params.clear();
        self
    }

    pub fn with_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    pub fn with_contract_params(&mut self, params: Vec<Value>) -> &mut Self {
        self.params = params;
        self
    }

    pub fn with_tx_params(&mut self, tx_params: TxOverrides) -> &mut Self {
        self.tx_params = Some(tx_params);
        self
    }

    pub fn with_contract_compression(&mut self) -> &mut Self {
        self.compress = true;
        self
    }

    pub fn with_user_defined_libraries(&mut self, libraries: Vec<UserDefinedLibrary>) -> &mut Self {
        self.libraries = Some(libraries);
        self
    }

    pub fn deploy(&mut self) -> Result<ScillaContract> {
        if self.name.trim().is_empty() {
            self.reset();
            return Err(Error::Deployment(
                "You must specify the contract name in order to deploy it.".into(),
            ));
        }
        let args = std::mem::take(&mut self.params);
        let tx_params = self.tx_params.take();
        let name = std::mem::take(&mut self.name);
        let libraries = self.libraries.take();
        let compress = self.compress;
        self.reset();

        self.ctx
            .deploy_with(&name, libraries.as_deref(), compress, args, tx_params.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Setup;
    use crate::model::ParsedContract;
    use crate::testing::RecordingClient;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeMap;

    // ── Compression ────────────────────────────────────

    #[test]
    fn test_compress_banner_comments() {
        let code = "(***************************************************)\n(*             The contract definition             *)\n(***************************************************)\ncontract HelloWorld\n(owner: ByStr20)";
        assert_eq!(compress_contract(code), "contract HelloWorld\n(owner: ByStr20)");
    }

    #[test]
    fn test_compress_leading_comment() {
        let code = "(*something*)contract HelloWorld\n(owner: ByStr20)";
        assert_eq!(compress_contract(code), "contract HelloWorld\n(owner: ByStr20)");
    }

    #[test]
    fn test_compress_trailing_comment() {
        let code = "contract HelloWorld (* a dummy comment*)\n(owner: ByStr20)";
        assert_eq!(compress_contract(code), "contract HelloWorld\n(owner: ByStr20)");
    }

    #[test]
    fn test_compress_mixed_comments() {
        let code = "contract WithComment          (*contract name*)\n()\n(*fields*)\nfield welcome_msg : String = \"\" (*welcome*) (*another comment*)  ";
        assert_eq!(
            compress_contract(code),
            "contract WithComment\n()\nfield welcome_msg : String = \"\""
        );
    }

    #[test]
    fn test_compress_keeps_comment_markers_in_strings() {
        let code = "field msg : String = \"(* not a comment *)\" (* gone *)";
        assert_eq!(compress_contract(code), "field msg : String = \"(* not a comment *)\"");
    }

    #[test]
    fn test_compress_multiline_and_nested() {
        let code = "(* outer (* inner *)\n still outer *)\nlibrary L";
        assert_eq!(compress_contract(code), "library L");
    }

    // ── Init lists ─────────────────────────────────────

    #[test]
    fn test_fill_init_with_libraries() {
        let params = vec![Field::primitive("ByStr20").named("owner")];
        let libs = vec![UserDefinedLibrary::new("AdditionLib", "0x1111")];
        let init = fill_init("HelloWorld", Some(&libs), Some(&params), &[json!("0xabcd")]).unwrap();
        assert_eq!(
            serde_json::to_value(&init).unwrap(),
            json!([
                {"vname": "_scilla_version", "type": "Uint32", "value": "0"},
                {"vname": "_extlibs", "type": "List (Pair String ByStr20)", "value": [
                    {"constructor": "Pair", "argtypes": ["String", "ByStr20"], "arguments": ["AdditionLib", "0x1111"]}
                ]},
                {"vname": "owner", "type": "ByStr20", "value": "0xabcd"}
            ])
        );
    }

    #[test]
    fn test_fill_init_numeric_stringified() {
        let params = vec![Field::primitive("Uint128").named("supply")];
        let init = fill_init("Token", None, Some(&params), &[json!(1000)]).unwrap();
        assert_eq!(init[1].value, EncodedValue::Scalar("1000".into()));
    }

    #[test]
    fn test_fill_init_rejects_args_without_params() {
        let err = fill_init("ADTTest", None, None, &[json!(1)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected to receive 0 parameters for ADTTest deployment but got 1"
        );
        assert_eq!(fill_init("ADTTest", None, None, &[]).unwrap().len(), 1);
    }

    #[test]
    fn test_fill_init_count_mismatch() {
        let params = vec![Field::primitive("ByStr20").named("owner")];
        assert!(matches!(
            fill_init("HelloWorld", None, Some(&params), &[]).unwrap_err(),
            Error::CallShape { expected: 1, found: 0, .. }
        ));
    }

    #[test]
    fn test_library_init() {
        assert_eq!(
            serde_json::to_value(fill_library_init()).unwrap(),
            json!([
                {"vname": "_scilla_version", "type": "Uint32", "value": "0"},
                {"vname": "_library", "type": "Bool", "value": {"constructor": "True", "argtypes": [], "arguments": []}}
            ])
        );
    }

    // ── Deploying through a context ────────────────────

    const SOURCE: &str = "(* hello *)\ncontract HelloWorld\n(owner: ByStr20)\n";

    fn hello_context(dir: &Path) -> ScillaContext<RecordingClient> {
        let path = dir.join("HelloWorld.scilla");
        fs::write(&path, SOURCE).unwrap();
        let info = ContractInfo {
            content_hash: content_hash(SOURCE.as_bytes()),
            path: path.display().to_string(),
            parsed_contract: ParsedContract {
                name: "HelloWorld".into(),
                constructor_params: Some(vec![Field::primitive("ByStr20").named("owner")]),
                fields: vec![],
                transitions: vec![],
                ctors: vec![],
            },
        };
        let mut ctx = ScillaContext::new(
            Setup::new(1),
            RecordingClient::default(),
            BTreeMap::from([("HelloWorld".to_string(), info)]),
        );
        ctx.set_default_sender("02deployer");
        ctx
    }

    #[test]
    fn test_deploy_binds_contract() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = hello_context(dir.path());
        let contract = ctx.deploy("HelloWorld", None, false, vec![json!("0x1")]).unwrap();

        assert_eq!(contract.deployed_by().unwrap().id, "deploy-1");
        assert_eq!(contract.executer(), Some("02deployer"));
        let deploy = ctx.client().last_deploy();
        assert_eq!(deploy.code, SOURCE);
        assert_eq!(deploy.init.len(), 2);
        assert_eq!(deploy.params.pub_key.as_deref(), Some("02deployer"));
    }

    #[test]
    fn test_deploy_trailing_overrides_and_compression() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = hello_context(dir.path());
        ctx.deploy("HelloWorld", None, true, vec![json!("0x1"), json!({"gasLimit": 30000})])
            .unwrap();
        let deploy = ctx.client().last_deploy();
        assert_eq!(deploy.code, "contract HelloWorld\n(owner: ByStr20)");
        assert_eq!(deploy.params.gas_limit, 30000);
        assert_eq!(deploy.init.len(), 2);
    }

    #[test]
    fn test_deploy_unknown_contract() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = hello_context(dir.path());
        let err = ctx.deploy("Nope", None, false, vec![]).unwrap_err();
        assert!(matches!(err, Error::MissingContract(_)));
    }

    #[test]
    fn test_deploy_library_init() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = hello_context(dir.path());
        ctx.deploy_library("HelloWorld").unwrap();
        let deploy = ctx.client().last_deploy();
        assert_eq!(deploy.init, fill_library_init());
    }

    #[test]
    fn test_deployer_builder_resets() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = hello_context(dir.path());
        let mut deployer = ctx.deployer();

        let err = deployer.deploy().unwrap_err();
        assert!(err.to_string().contains("contract name"));

        deployer
            .with_name("HelloWorld")
            .with_contract_params(vec![json!("0x1")])
            .with_tx_params(TxOverrides {
                amount: Some(5),
                ..Default::default()
            })
            .with_contract_compression()
            .with_user_defined_libraries(vec![UserDefinedLibrary::new("L", "0x2")]);
        deployer.deploy().unwrap();

        let deploy = ctx.client().last_deploy();
        assert_eq!(deploy.params.amount, 5);
        assert_eq!(deploy.init[1].vname, "_extlibs");
        assert!(!deploy.code.contains("(*"));

        // settings do not leak into the next deployment
        assert!(deployer.deploy().is_err());
    }

    #[test]
    fn test_deployer_tx_params_without_constructor_params() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Codehash.scilla");
        fs::write(&path, "contract Codehash()
").unwrap();
        let info = ContractInfo {
            content_hash: crate::cache::file_hash(&path).unwrap(),
            path: path.display().to_string(),
            parsed_contract: ParsedContract {
                name: "Codehash".into(),
                constructor_params: None,
                fields: vec![],
                transitions: vec![],
                ctors: vec![],
            },
        };
        let ctx = ScillaContext::new(
            Setup::new(1),
            RecordingClient::default(),
            BTreeMap::from([("Codehash".to_string(), info)]),
        );

        ctx.deployer()
            .with_name("Codehash")
            .with_tx_params(TxOverrides {
                amount: Some(5),
                ..Default::default()
            })
            .deploy()
            .unwrap();
        let deploy = ctx.client().last_deploy();
        assert_eq!(deploy.params.amount, 5);
        assert_eq!(deploy.init, vec![version_entry()]);

        // a trailing positional override still has no slot here
        assert!(matches!(
            ctx.deploy("Codehash", None, false, vec![json!({"amount": "5"})]).unwrap_err(),
            Error::CallShape { expected: 0, found: 1, .. }
        ));
    }

    #[test]
    fn test_deploy_with_explicit_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = hello_context(dir.path());
        let overrides = TxOverrides {
            gas_limit: Some(12345),
            ..Default::default()
        };
        ctx.deploy_with("HelloWorld", None, false, vec![json!("0x1")], Some(&overrides))
            .unwrap();
        assert_eq!(ctx.client().last_deploy().params.gas_limit, 12345);

        let err = ctx
            .deploy_with("HelloWorld", None, false, vec![json!("0x1"), json!({})], Some(&overrides))
            .unwrap_err();
        assert!(matches!(err, Error::CallShape { expected: 1, found: 2, .. }));
    }

    #[test]
    fn test_contract_from_address() {
        struct FixedDump;
        impl SexpCompiler for FixedDump {
            fn to_sexp(&self, path: &Path) -> Result<String> {
                assert_eq!(path.extension().and_then(|e| e.to_str()), Some("scilla"));
                Ok("((contr ((cname (Ident (SimpleLocal Remote) ())) (cparams ()) (cfields ()) (ccomps ()))))".into())
            }
        }
        let mut client = RecordingClient::default();
        client.code.insert("0xfeed".into(), "contract Remote()".into());
        let ctx = ScillaContext::new(Setup::new(1), client, BTreeMap::new());

        let contract = ctx.contract_from_address("0xfeed", &FixedDump).unwrap().unwrap();
        assert_eq!(contract.parsed().name, "Remote");
        assert_eq!(contract.info().path, "0xfeed");
        assert_eq!(contract.address(), "0xfeed");
        assert!(ctx.contract_from_address("0xdead", &FixedDump).unwrap().is_none());
    }
}
