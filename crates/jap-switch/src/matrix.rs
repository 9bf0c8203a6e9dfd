//! Matrix setup
//!
//! Wires a [`MatrixConfig`] into one shared [`Switch`], a transmitter
//! catalog and one [`Receiver`] per configured receiver.

use std::sync::Arc;

use jap_protocol::ReceiverId;
use tracing::info;

use crate::catalog::TransmitterCatalog;
use crate::config::MatrixConfig;
use crate::endpoint::EndpointSession;
use crate::error::SwitchError;
use crate::receiver::Receiver;
use crate::route::RouteController;
use crate::switch::Switch;
use crate::transport::Connector;

/// A switch and every receiver configured on it
pub struct Matrix {
    switch: Arc<Switch>,
    controller: Arc<RouteController>,
    receivers: Vec<Receiver>,
}

impl Matrix {
    /// Connect to the switch, read its layout and discover every receiver
    ///
    /// Fails if the switch cannot be reached or its VLAN table has no layout
    /// marker. Unreachable receivers do not fail setup; they stay offline.
    pub async fn connect(
        config: &MatrixConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, SwitchError> {
        config.validate()?;
        let infos = config.receiver_infos()?;

        let switch = Arc::new(
            Switch::new(config.switch_config(), connector.clone())
                .with_receivers(config.receiver_ids()),
        );
        switch.refresh().await?;

        let catalog = Arc::new(TransmitterCatalog::new(config.transmitters()));
        let controller = Arc::new(RouteController::new(switch.clone(), catalog));

        let mut receivers = Vec::with_capacity(infos.len());
        for info in infos {
            info!("Adding {} - {}", info.id, info.name);
            let endpoint = EndpointSession::new(
                info.address.to_string(),
                connector.clone(),
                config.session.clone(),
            );
            let mut receiver = Receiver::new(info, controller.clone(), endpoint);
            receiver.discover().await?;
            receivers.push(receiver);
        }

        Ok(Self {
            switch,
            controller,
            receivers,
        })
    }

    pub fn switch(&self) -> &Arc<Switch> {
        &self.switch
    }

    pub fn controller(&self) -> &Arc<RouteController> {
        &self.controller
    }

    pub fn receiver(&self, id: ReceiverId) -> Option<&Receiver> {
        self.receivers.iter().find(|rx| rx.id() == id)
    }

    pub fn receiver_mut(&mut self, id: ReceiverId) -> Option<&mut Receiver> {
        self.receivers.iter_mut().find(|rx| rx.id() == id)
    }

    /// Receiver with the given display name
    pub fn receiver_by_name(&mut self, name: &str) -> Option<&mut Receiver> {
        self.receivers.iter_mut().find(|rx| rx.name() == name)
    }

    pub fn receivers(&self) -> &[Receiver] {
        &self.receivers
    }

    pub fn receivers_mut(&mut self) -> &mut [Receiver] {
        &mut self.receivers
    }

    /// Hand the receivers to independent tasks
    pub fn into_receivers(self) -> Vec<Receiver> {
        self.receivers
    }

    /// Names of every selectable source, ordered by transmitter id
    pub fn source_list(&self) -> Vec<&str> {
        self.controller.catalog().source_list()
    }

    /// Refresh every online receiver's source
    pub async fn update(&mut self) {
        for receiver in &mut self.receivers {
            receiver.update().await;
        }
    }

    /// Close every receiver session and the switch session
    pub async fn disconnect(&mut self) {
        for receiver in &mut self.receivers {
            receiver.disconnect().await;
        }
        self.switch.disconnect().await;
    }
}
