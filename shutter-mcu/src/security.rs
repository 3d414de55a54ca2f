//! Pairing negotiation shared by every BLE link

use crate::ble::PairingResponder;
use crate::config::PairingPolicy;
use crate::events::{Link, SecurityEvent};
use log::{debug, info, warn};

/// State of the one handshake in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingSession {
    pub link: Link,
    pub passkey: Option<u32>,
    pub confirmed: bool,
}

/// Result of a finished handshake, routed to the link's owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingOutcome {
    pub link: Link,
    pub success: bool,
}

#[derive(Debug)]
pub struct BleSecurityNegotiator {
    policy: PairingPolicy,
    session: Option<PairingSession>,
}

impl BleSecurityNegotiator {
    pub fn new(policy: PairingPolicy) -> Self {
        Self {
            policy,
            session: None,
        }
    }

    pub fn policy(&self) -> &PairingPolicy {
        &self.policy
    }

    pub fn session(&self) -> Option<&PairingSession> {
        self.session.as_ref()
    }

    fn session_for(&mut self, link: Link) -> &mut PairingSession {
        let stale = self.session.as_ref().map(|s| s.link).filter(|l| *l != link);
        if let Some(stale) = stale {
            warn!("pairing with {link} replaces unfinished pairing with {stale}");
            self.session = None;
        }
        if self.session.is_none() {
            debug!("pairing started with {link}");
        }
        self.session.get_or_insert(PairingSession {
            link,
            passkey: None,
            confirmed: false,
        })
    }

    pub fn on_passkey_request(&mut self, link: Link) -> u32 {
        let passkey = self.policy.passkey;
        info!("passkey requested by {link}");
        self.session_for(link).passkey = Some(passkey);
        passkey
    }

    pub fn on_passkey_notify(&mut self, link: Link, passkey: u32) {
        info!("passkey for {link}: {passkey:06}");
        self.session_for(link).passkey = Some(passkey);
    }

    pub fn on_confirm_pin(&mut self, link: Link, pin: u32) -> bool {
        let accept = self.policy.auto_confirm || pin == self.policy.passkey;
        info!("confirm PIN {pin:06} for {link}: {}", if accept { "accepted" } else { "rejected" });
        let session = self.session_for(link);
        session.passkey = Some(pin);
        session.confirmed = accept;
        accept
    }

    pub fn on_security_request(&mut self, link: Link) -> bool {
        let accept = self.policy.accept_security_requests;
        info!("security request from {link}: {}", if accept { "allowed" } else { "refused" });
        if accept {
            self.session_for(link);
        }
        accept
    }

    /// Ends the session for `link`; the outcome goes to exactly one owner
    pub fn on_authentication_complete(&mut self, link: Link, success: bool) -> PairingOutcome {
        if success {
            info!("pairing with {link} succeeded");
        } else {
            warn!("pairing with {link} failed");
        }
        if self.session.as_ref().is_some_and(|s| s.link == link) {
            self.session = None;
        }
        PairingOutcome { link, success }
    }

    /// Apply one stack event, replying through `responder` where the stack waits for an answer
    pub fn handle(
        &mut self,
        link: Link,
        event: SecurityEvent,
        responder: &mut dyn PairingResponder,
    ) -> Option<PairingOutcome> {
        match event {
            SecurityEvent::PasskeyRequest => {
                let passkey = self.on_passkey_request(link);
                responder.passkey_reply(link, passkey);
                None
            }
            SecurityEvent::PasskeyNotify(passkey) => {
                self.on_passkey_notify(link, passkey);
                None
            }
            SecurityEvent::ConfirmPin(pin) => {
                let accept = self.on_confirm_pin(link, pin);
                responder.confirm_reply(link, accept);
                None
            }
            SecurityEvent::SecurityRequest => {
                let accept = self.on_security_request(link);
                responder.security_reply(link, accept);
                None
            }
            SecurityEvent::AuthenticationComplete { success } => {
                Some(self.on_authentication_complete(link, success))
            }
        }
    }
}
