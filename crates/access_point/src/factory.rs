use std::sync::Arc;

use config::GatewayConfig;
use peppol_gw_core::{GatewayError, ProviderIdentity};
use transport::default_stack;

use crate::einvoicing_be::EInvoicingBeConnection;
use crate::lets_peppol::LetsPeppolConnection;
use crate::peppyrus::PeppyrusConnection;
use crate::storecove::StoreCoveConnection;
use crate::ProviderConnection;

/// Builds fully configured provider connections.
///
/// Every `create` call constructs a fresh transport/decorator stack and a
/// fresh connection; nothing is cached or reused across calls, so one
/// logical operation can never observe another's headers, credentials, or
/// token cache.
pub struct ConnectionFactory {
    config: GatewayConfig,
}

impl ConnectionFactory {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    pub fn create(
        &self,
        provider: ProviderIdentity,
    ) -> Result<Arc<dyn ProviderConnection>, GatewayError> {
        match provider {
            ProviderIdentity::StoreCove => Ok(self.storecove()?),
            ProviderIdentity::LetsPeppol => Ok(self.lets_peppol()?),
            ProviderIdentity::Peppyrus => Ok(self.peppyrus()?),
            ProviderIdentity::EInvoicingBe => Ok(self.einvoicing_be()?),
        }
    }

    /// Parse a config-level provider kind string and build the matching
    /// connection. Unknown names fail with `UnsupportedProvider`.
    pub fn create_by_name(
        &self,
        name: &str,
    ) -> Result<Arc<dyn ProviderConnection>, GatewayError> {
        let provider = name.parse::<ProviderIdentity>()?;
        self.create(provider)
    }

    pub fn storecove(&self) -> Result<Arc<StoreCoveConnection>, GatewayError> {
        let api_key = self
            .config
            .storecove_api_key()
            .ok_or_else(|| GatewayError::configuration("StoreCove API key is not configured"))?;
        Ok(StoreCoveConnection::new(
            self.config.base_url(ProviderIdentity::StoreCove),
            api_key,
            default_stack(self.config.default_timeout()),
        ))
    }

    pub fn lets_peppol(&self) -> Result<Arc<LetsPeppolConnection>, GatewayError> {
        let api_key = self
            .config
            .lets_peppol_api_key()
            .ok_or_else(|| GatewayError::configuration("LetsPeppol API key is not configured"))?;
        Ok(LetsPeppolConnection::new(
            self.config.base_url(ProviderIdentity::LetsPeppol),
            api_key,
            default_stack(self.config.default_timeout()),
        ))
    }

    pub fn peppyrus(&self) -> Result<Arc<PeppyrusConnection>, GatewayError> {
        let (client_id, client_secret) =
            self.config.peppyrus_client_credentials().ok_or_else(|| {
                GatewayError::configuration("Peppyrus client credentials are not configured")
            })?;
        Ok(PeppyrusConnection::new(
            self.config.base_url(ProviderIdentity::Peppyrus),
            client_id,
            client_secret,
            default_stack(self.config.default_timeout()),
        ))
    }

    pub fn einvoicing_be(&self) -> Result<Arc<EInvoicingBeConnection>, GatewayError> {
        let (token, api_key) = self.config.einvoicing_be_credentials().ok_or_else(|| {
            GatewayError::configuration("EInvoicing.be credentials are not configured")
        })?;
        Ok(EInvoicingBeConnection::new(
            self.config.base_url(ProviderIdentity::EInvoicingBe),
            token,
            api_key,
            default_stack(self.config.default_timeout()),
        ))
    }
}
