//! The identity state machine: onboarding, rekey, credential reconciliation, and
//! self-issued access tokens.
//!
//! All mutating operations are serialized through an optional caller-supplied
//! [`CriticalSection`](crate::config::CriticalSection) rather than an internal lock that
//! would be invisible to other processes sharing the same backing store.

// self
use super::{
	record::{AccessToken, IdentityRecord, SecretMaterial},
	store::CredentialPersistence,
	wire::{Jwk, JwkSet, RegistrationRequest, RegistrationResponse, TokenResponse},
};
use crate::{
	_prelude::*,
	compose::{self, Bearer, ContentType},
	config::AgentConfig,
	http::{HttpEngine, HttpRequest, Method},
	jwt::{self, Clock, SigningKey, SystemClock},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	security,
};

const JWT_BEARER_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Lifecycle state of an [`IdentityContext`], tracking how far onboarding has progressed.
///
/// There is no separate "uninitialized" variant: [`IdentityContext::new`] performs the
/// load-or-seed transition atomically during construction and only ever returns a context
/// already in `Configured` or `Onboarded`.
#[derive(Clone, Debug)]
pub enum IdentityState {
	/// Not yet onboarded. Holds a pre-generated RSA key pair for the `Rsa3072` profile, so
	/// the same key pair used in the (not yet sent) registration request is the one
	/// persisted on success.
	Configured {
		/// `(public_key_pem, private_key_pem)`, present only under the `Rsa3072` profile.
		rsa_keys: Option<(String, String)>,
	},
	/// Onboarded: a durable [`IdentityRecord`] exists, plus the volatile access-token
	/// state the persistence contract never sees.
	Onboarded {
		/// The durable record.
		record: IdentityRecord,
		/// Most recently issued access token, if any.
		access_token: Option<AccessToken>,
		/// `Server-Time` header value returned with that token, if any.
		last_token_server_time: Option<String>,
	},
}

struct CriticalSectionGuard<'a>(Option<&'a Arc<dyn crate::config::CriticalSection>>);
impl<'a> CriticalSectionGuard<'a> {
	fn enter(section: Option<&'a Arc<dyn crate::config::CriticalSection>>) -> Self {
		if let Some(section) = section {
			section.enter();
		}

		Self(section)
	}
}
impl Drop for CriticalSectionGuard<'_> {
	fn drop(&mut self) {
		if let Some(section) = self.0 {
			section.leave();
		}
	}
}

/// The identity context: onboarding, rekey, and access-token issuance for one agent
/// identity, generic over the HTTP transport.
pub struct IdentityContext<E> {
	config: AgentConfig,
	engine: E,
	persistence: Arc<dyn CredentialPersistence>,
	state: Mutex<IdentityState>,
}
#[cfg(feature = "reqwest")]
impl IdentityContext<crate::http::ReqwestHttpEngine> {
	/// Builds a context over the reqwest-backed engine, composing it from `config`.
	pub fn new(config: AgentConfig, persistence: Arc<dyn CredentialPersistence>) -> Result<Self> {
		let engine = crate::http::ReqwestHttpEngine::new(&config)?;

		Self::with_http_engine(config, engine, persistence)
	}
}
impl<E: HttpEngine> IdentityContext<E> {
	/// Builds a context over an arbitrary [`HttpEngine`], loading (or seeding) the initial
	/// state from `persistence`.
	///
	/// Loading `None` with no `enrollment_token` configured is fatal
	/// ([`Error::NoAccessTokenProvided`](crate::error::Error::NoAccessTokenProvided)); this
	/// is the only case `new` itself can fail on the persistence side.
	pub fn with_http_engine(
		config: AgentConfig,
		engine: E,
		persistence: Arc<dyn CredentialPersistence>,
	) -> Result<Self> {
		let state = match persistence.load()? {
			Some(record) =>
				IdentityState::Onboarded { record, access_token: None, last_token_server_time: None },
			None => {
				if config.enrollment_token.is_none() {
					return Err(Error::NoAccessTokenProvided);
				}

				let rsa_keys = match config.security_profile {
					crate::config::SecurityProfile::Rsa3072 =>
						Some(security::generate_rsa_3072()?),
					crate::config::SecurityProfile::Shared => None,
				};

				IdentityState::Configured { rsa_keys }
			},
		};

		Ok(Self { config, engine, persistence, state: Mutex::new(state) })
	}

	/// Returns whether the identity has completed onboarding.
	pub fn is_onboarded(&self) -> bool {
		matches!(&*self.state.lock(), IdentityState::Onboarded { .. })
	}

	/// Performs initial onboarding.
	///
	/// Errors with
	/// [`Error::AlreadyOnboarded`](crate::error::Error::AlreadyOnboarded) if the identity
	/// has already onboarded; use [`Self::rotate_key`] to rekey an onboarded identity.
	pub async fn register(&self) -> Result<()> {
		const KIND: OperationKind = OperationKind::Register;

		let span = OperationSpan::new(KIND, "register");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _guard = CriticalSectionGuard::enter(self.config.critical_section.as_ref());

				if matches!(&*self.state.lock(), IdentityState::Onboarded { .. }) {
					return Err(Error::AlreadyOnboarded);
				}

				let enrollment_token = self
					.config
					.enrollment_token
					.as_deref()
					.ok_or(Error::NoAccessTokenProvided)?;
				let rsa_keys = match &*self.state.lock() {
					IdentityState::Configured { rsa_keys } => rsa_keys.clone(),
					IdentityState::Onboarded { .. } => unreachable!("checked above"),
				};
				let body = registration_body(None, self.config.security_profile, rsa_keys.as_ref())?;
				let record = self
					.submit_registration(
						self.config.enrollment_endpoint.clone(),
						enrollment_token,
						&body,
						rsa_keys,
					)
					.await?;

				self.commit_onboarded(record)
			})
			.await;

		match &result {
			Ok(_) => obs::record_operation_outcome(KIND, OperationOutcome::Success),
			Err(_) => obs::record_operation_outcome(KIND, OperationOutcome::Failure),
		}

		result
	}

	/// Rekeys an already-onboarded identity: rotates the client secret (`Shared` profile)
	/// or generates and submits a fresh key pair (`Rsa3072` profile).
	///
	/// Callers are responsible for invoking this only after a successful access-token
	/// fetch, or explicitly in response to a 400 from token acquisition; the context
	/// itself does not enforce that precondition (see DESIGN.md).
	pub async fn rotate_key(&self) -> Result<()> {
		const KIND: OperationKind = OperationKind::RotateKey;

		let span = OperationSpan::new(KIND, "rotate_key");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _guard = CriticalSectionGuard::enter(self.config.critical_section.as_ref());

				let (client_id, registration_uri, registration_access_token) =
					match &*self.state.lock() {
						IdentityState::Onboarded { record, .. } => (
							record.client_id.clone(),
							record.registration_uri.clone(),
							record.registration_access_token.clone(),
						),
						IdentityState::Configured { .. } => return Err(Error::NotOnboarded),
					};
				let rsa_keys = match self.config.security_profile {
					crate::config::SecurityProfile::Rsa3072 =>
						Some(security::generate_rsa_3072()?),
					crate::config::SecurityProfile::Shared => None,
				};
				let body = registration_body(
					Some(&client_id),
					self.config.security_profile,
					rsa_keys.as_ref(),
				)?;
				let record = self
					.submit_registration(registration_uri, &registration_access_token, &body, rsa_keys)
					.await?;

				self.commit_onboarded(record)
			})
			.await;

		match &result {
			Ok(_) => obs::record_operation_outcome(KIND, OperationOutcome::Success),
			Err(_) => obs::record_operation_outcome(KIND, OperationOutcome::Failure),
		}

		result
	}

	/// Reconciles in-memory state against the backing store, for out-of-band rekeys
	/// performed by another process sharing the same store.
	///
	/// Returns [`Error::CredentialsUpToDate`](crate::error::Error::CredentialsUpToDate) if
	/// the loaded record matches the current one exactly.
	pub fn update_credentials(&self) -> Result<()> {
		const KIND: OperationKind = OperationKind::UpdateCredentials;

		let _span = OperationSpan::new(KIND, "update_credentials").entered();

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = (|| {
			let _guard = CriticalSectionGuard::enter(self.config.critical_section.as_ref());
			let loaded = self.persistence.load()?.ok_or(Error::CredentialsNotLoaded)?;
			let mut state = self.state.lock();

			if let IdentityState::Onboarded { record, .. } = &*state {
				if *record == loaded {
					return Err(Error::CredentialsUpToDate);
				}
			}

			*state =
				IdentityState::Onboarded { record: loaded, access_token: None, last_token_server_time: None };

			Ok(())
		})();

		match &result {
			Ok(_) => obs::record_operation_outcome(KIND, OperationOutcome::Success),
			Err(_) => obs::record_operation_outcome(KIND, OperationOutcome::Failure),
		}

		result
	}

	/// Fetches a fresh self-issued access token, signing a new JWT grant with the
	/// current identity material and storing the result (and its `Server-Time`) for
	/// [`Self::get_last_access_token`]/[`Self::get_last_token_time`].
	pub async fn get_access_token(&self) -> Result<()> {
		const KIND: OperationKind = OperationKind::AccessToken;

		let span = OperationSpan::new(KIND, "get_access_token");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let (client_id, material) = match &*self.state.lock() {
					IdentityState::Onboarded { record, .. } =>
						(record.client_id.clone(), record.material.clone()),
					IdentityState::Configured { .. } => return Err(Error::NotOnboarded),
				};
				let signing_key = match &material {
					SecretMaterial::Shared { client_secret } => SigningKey::Shared { client_secret },
					SecretMaterial::Rsa { private_key_pem, .. } => SigningKey::Rsa { private_key_pem },
				};
				let grant = jwt::build_grant(
					&client_id,
					&self.config.tenant,
					self.config.platform_base_url.as_str(),
					&signing_key,
					&SystemClock,
				)?;
				let mut form = url::form_urlencoded::Serializer::new(String::new());

				form.append_pair("grant_type", "client_credentials");
				form.append_pair("client_assertion_type", JWT_BEARER_ASSERTION_TYPE);
				form.append_pair("client_assertion", &grant);

				let headers = compose::standard_headers(
					None,
					&self.config.user_agent_comment,
					true,
					Some(ContentType::FormUrlEncoded),
				);
				let mut request = HttpRequest::new(Method::Post, self.config.token_endpoint.clone())
					.with_bytes_body(form.finish().into_bytes());

				for (name, value) in headers.pairs {
					request = request.header(name, value);
				}

				let response = self.engine.send(request).await?;
				let response = compose::check_status(response, |r| response_excerpt(r))?;
				let server_time = response.header("Server-Time").map(str::to_owned);
				let parsed: TokenResponse = Error::parse_json(&response.body)?;

				if let IdentityState::Onboarded { access_token, last_token_server_time, .. } =
					&mut *self.state.lock()
				{
					*access_token = Some(AccessToken::new(parsed.access_token));
					*last_token_server_time = server_time;
				}

				Ok(())
			})
			.await;

		match &result {
			Ok(_) => obs::record_operation_outcome(KIND, OperationOutcome::Success),
			Err(_) => obs::record_operation_outcome(KIND, OperationOutcome::Failure),
		}

		result
	}

	/// Returns the most recently issued access token.
	pub fn get_last_access_token(&self) -> Result<AccessToken> {
		match &*self.state.lock() {
			IdentityState::Onboarded { access_token: Some(token), .. } => Ok(token.clone()),
			IdentityState::Onboarded { access_token: None, .. } => Err(Error::NoAccessTokenExists),
			IdentityState::Configured { .. } => Err(Error::NotOnboarded),
		}
	}

	/// Returns the HTTP engine backing this context, for the uploads/deployments
	/// contexts layered on top of the same identity.
	pub(crate) fn engine(&self) -> &E {
		&self.engine
	}

	/// Returns the configuration backing this context.
	pub(crate) fn config(&self) -> &AgentConfig {
		&self.config
	}

	/// Returns the `Server-Time` reported alongside the most recently issued access
	/// token.
	pub fn get_last_token_time(&self) -> Result<String> {
		match &*self.state.lock() {
			IdentityState::Onboarded { last_token_server_time: Some(time), .. } => Ok(time.clone()),
			IdentityState::Onboarded { last_token_server_time: None, .. } => Err(Error::NoServerTime),
			IdentityState::Configured { .. } => Err(Error::NotOnboarded),
		}
	}

	async fn submit_registration(
		&self,
		endpoint: Url,
		bearer: &str,
		body: &RegistrationRequest,
		rsa_keys: Option<(String, String)>,
	) -> Result<IdentityRecord> {
		let headers = compose::standard_headers(
			Some(Bearer::IdentityToken(bearer)),
			&self.config.user_agent_comment,
			true,
			Some(ContentType::Json),
		);
		let payload = serde_json::to_vec(body)
			.map_err(|e| Error::Fail { reason: format!("Failed to encode registration body: {e}.") })?;
		let mut request = HttpRequest::new(Method::Post, endpoint).with_bytes_body(payload);

		for (name, value) in headers.pairs {
			request = request.header(name, value);
		}

		let response = self.engine.send(request).await?;
		let response = compose::check_status(response, |r| response_excerpt(r))?;
		let parsed: RegistrationResponse = Error::parse_json(&response.body)?;
		let material = match (self.config.security_profile, parsed.client_secret, rsa_keys) {
			(crate::config::SecurityProfile::Shared, Some(client_secret), _) =>
				SecretMaterial::Shared { client_secret },
			(crate::config::SecurityProfile::Rsa3072, _, Some((public_key_pem, private_key_pem))) =>
				SecretMaterial::Rsa { public_key_pem, private_key_pem },
			_ => return Err(Error::Fail {
				reason: "Registration response did not carry the material expected for the configured security profile.".to_owned(),
			}),
		};

		Ok(IdentityRecord {
			client_id: parsed.client_id,
			material,
			registration_access_token: parsed.registration_access_token,
			registration_uri: parsed.registration_client_uri,
		})
	}

	/// Persists `record` and advances in-memory state to `Onboarded` regardless of
	/// whether the save succeeds—state always reflects what the server accepted; a save
	/// failure is reported but never rolled back (see DESIGN.md).
	fn commit_onboarded(&self, record: IdentityRecord) -> Result<()> {
		let save_result = self.persistence.save(&record);

		*self.state.lock() =
			IdentityState::Onboarded { record, access_token: None, last_token_server_time: None };

		save_result.map_err(|_| Error::CredentialsNotSaved)
	}
}

fn registration_body(
	client_id: Option<&str>,
	profile: crate::config::SecurityProfile,
	rsa_keys: Option<&(String, String)>,
) -> Result<RegistrationRequest> {
	let jwks = match (profile, rsa_keys) {
		(crate::config::SecurityProfile::Rsa3072, Some((public_key_pem, _))) => {
			let (n, e) = security::modulus_and_exponent(public_key_pem)?;

			Some(JwkSet {
				keys: vec![Jwk {
					kty: "RSA",
					kid: client_id.unwrap_or_default().to_owned(),
					n,
					e,
					alg: "RS256",
					usage: "sig",
				}],
			})
		},
		_ => None,
	};

	Ok(RegistrationRequest { client_id: client_id.map(str::to_owned), jwks })
}

fn response_excerpt(response: &crate::http::HttpResponse) -> String {
	String::from_utf8_lossy(&response.body).chars().take(256).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		config::{AgentConfig, SecurityProfile},
		http::{EngineFuture, HttpResponse},
		identity::store::MemoryCredentialStore,
	};

	struct ScriptedEngine {
		responses: Mutex<Vec<Result<HttpResponse>>>,
	}
	impl ScriptedEngine {
		fn new(responses: Vec<Result<HttpResponse>>) -> Self {
			Self { responses: Mutex::new(responses) }
		}
	}
	impl HttpEngine for ScriptedEngine {
		fn send<'a>(&'a self, _request: HttpRequest) -> EngineFuture<'a, HttpResponse> {
			let next = self.responses.lock().pop();

			Box::pin(async move { next.unwrap_or_else(|| Err(Error::Fail { reason: "no scripted response left".into() })) })
		}
	}

	fn base_config(profile: SecurityProfile) -> AgentConfig {
		let base = Url::parse("https://southgate.example.com").unwrap();

		AgentConfig::builder(base.clone(), profile)
			.tenant("tenant-1")
			.enrollment_endpoint(base.join("/register").unwrap())
			.token_endpoint(base.join("/token").unwrap())
			.enrollment_token("seed-token")
			.build()
			.unwrap()
	}

	fn registration_response_body(client_id: &str, with_secret: bool) -> Vec<u8> {
		let mut value = serde_json::json!({
			"client_id": client_id,
			"registration_access_token": "rat-1",
			"registration_client_uri": format!("https://southgate.example.com/register/{client_id}"),
		});

		if with_secret {
			value["client_secret"] = serde_json::json!("secret-1");
		}

		serde_json::to_vec(&value).unwrap()
	}

	#[tokio::test]
	async fn register_onboards_shared_profile_identity() {
		let engine = ScriptedEngine::new(vec![Ok(HttpResponse {
			status: 201,
			headers: Vec::new(),
			body: registration_response_body("client-1", true),
		})]);
		let store = Arc::new(MemoryCredentialStore::default());
		let context =
			IdentityContext::with_http_engine(base_config(SecurityProfile::Shared), engine, store)
				.expect("Context should construct in Configured state.");

		assert!(!context.is_onboarded());

		context.register().await.expect("Registration should succeed.");

		assert!(context.is_onboarded());
	}

	#[tokio::test]
	async fn register_on_onboarded_identity_is_rejected() {
		let engine = ScriptedEngine::new(vec![Ok(HttpResponse {
			status: 201,
			headers: Vec::new(),
			body: registration_response_body("client-1", true),
		})]);
		let store = Arc::new(MemoryCredentialStore::default());
		let context =
			IdentityContext::with_http_engine(base_config(SecurityProfile::Shared), engine, store)
				.unwrap();

		context.register().await.unwrap();

		let err = context.register().await.expect_err("Second register must be rejected.");

		assert!(matches!(err, Error::AlreadyOnboarded));
	}

	#[tokio::test]
	async fn rotate_key_before_onboarding_is_rejected() {
		let engine = ScriptedEngine::new(Vec::new());
		let store = Arc::new(MemoryCredentialStore::default());
		let context =
			IdentityContext::with_http_engine(base_config(SecurityProfile::Shared), engine, store)
				.unwrap();
		let err = context.rotate_key().await.expect_err("Rekey before onboarding must be rejected.");

		assert!(matches!(err, Error::NotOnboarded));
	}

	#[test]
	fn new_without_enrollment_token_or_stored_record_fails() {
		let base = Url::parse("https://southgate.example.com").unwrap();
		let config = AgentConfig::builder(base.clone(), SecurityProfile::Shared)
			.tenant("tenant-1")
			.enrollment_endpoint(base.join("/register").unwrap())
			.token_endpoint(base.join("/token").unwrap())
			.build()
			.unwrap();
		let store = Arc::new(MemoryCredentialStore::default());
		let err = IdentityContext::with_http_engine(config, ScriptedEngine::new(Vec::new()), store)
			.expect_err("No enrollment token and nothing stored must fail construction.");

		assert!(matches!(err, Error::NoAccessTokenProvided));
	}
}
