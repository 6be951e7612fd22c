//! Typed port registry.
//!
//! Components talk to each other through ports. A port is identified by the owning
//! component and its role (`PortKey`). This module provides:
//! 1. **Roles:** Each role has a fixed direction (request initiator or response target)
//!    and arity (a single peer, or a vector that fans out inside a crossbar).
//! 2. **Connections:** `connect` pairs one request port with one response port and
//!    enforces the at-most-one-peer invariant of single ports.
//! 3. **Freeze checks:** `unconnected_required` lists required ports still missing a peer.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

use crate::common::TopologyError;
use crate::soc::component::ComponentId;

/// Which side initiates transactions over a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortDirection {
    /// Sends requests, receives responses.
    Request,
    /// Receives requests, sends responses.
    Response,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::Response => write!(f, "response"),
        }
    }
}

/// How many peers a port accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortArity {
    /// Exactly one peer.
    Single,
    /// Any number of peers, each getting its own index.
    Vector,
}

/// The role a port plays on its component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PortRole {
    /// Cache port facing the cpu (or the crossbar above it).
    CpuSide,
    /// Cache port facing memory.
    MemSide,
    /// Crossbar port set facing request initiators.
    CpuSidePorts,
    /// Crossbar port set facing response targets.
    MemSidePorts,
    /// Cpu instruction fetch port.
    IcachePort,
    /// Cpu data port.
    DcachePort,
    /// Interrupt controller programmed-I/O port.
    Pio,
    /// Interrupt controller message requestor.
    IntRequestor,
    /// Interrupt controller message responder.
    IntResponder,
    /// The system's functional access port.
    SystemPort,
    /// Memory controller port.
    Port,
}

impl PortRole {
    /// Name of the role as it appears in port labels.
    pub const fn name(self) -> &'static str {
        match self {
            Self::CpuSide => "cpu_side",
            Self::MemSide => "mem_side",
            Self::CpuSidePorts => "cpu_side_ports",
            Self::MemSidePorts => "mem_side_ports",
            Self::IcachePort => "icache_port",
            Self::DcachePort => "dcache_port",
            Self::Pio => "pio",
            Self::IntRequestor => "int_requestor",
            Self::IntResponder => "int_responder",
            Self::SystemPort => "system_port",
            Self::Port => "port",
        }
    }

    /// Direction of the role.
    pub const fn direction(self) -> PortDirection {
        match self {
            Self::MemSide
            | Self::MemSidePorts
            | Self::IcachePort
            | Self::DcachePort
            | Self::IntRequestor
            | Self::SystemPort => PortDirection::Request,
            Self::CpuSide
            | Self::CpuSidePorts
            | Self::Pio
            | Self::IntResponder
            | Self::Port => PortDirection::Response,
        }
    }

    /// Arity of the role.
    pub const fn arity(self) -> PortArity {
        match self {
            Self::CpuSidePorts | Self::MemSidePorts => PortArity::Vector,
            _ => PortArity::Single,
        }
    }
}

impl fmt::Display for PortRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A port: owning component plus role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortKey {
    /// Owning component.
    pub component: ComponentId,
    /// Role on that component.
    pub role: PortRole,
}

impl PortKey {
    /// Shorthand constructor.
    pub const fn new(component: ComponentId, role: PortRole) -> Self {
        Self { component, role }
    }
}

impl fmt::Display for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.role)
    }
}

/// One end of a connection; `index` distinguishes the members of a vector port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortEndpoint {
    /// The port.
    pub key: PortKey,
    /// Slot within a vector port, always 0 for single ports.
    pub index: u32,
}

/// A request/response pairing of two ports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Initiating end.
    pub request: PortEndpoint,
    /// Target end.
    pub response: PortEndpoint,
}

impl Connection {
    /// The end that is not `key`, if `key` takes part in this connection.
    pub fn other_end(&self, key: PortKey) -> Option<PortEndpoint> {
        if self.request.key == key {
            Some(self.response)
        } else if self.response.key == key {
            Some(self.request)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug)]
struct PortSlot {
    label: String,
    required: bool,
    connections: Vec<usize>,
}

/// All declared ports of a graph and the connections between them.
#[derive(Clone, Debug, Default)]
pub struct PortRegistry {
    ports: BTreeMap<PortKey, PortSlot>,
    connections: Vec<Connection>,
}

impl PortRegistry {
    /// Creates an empty registry.
    pub const fn new() -> Self {
        Self {
            ports: BTreeMap::new(),
            connections: Vec::new(),
        }
    }

    /// Declares `role` on `component`; `owner_path` is used for diagnostics.
    ///
    /// A `required` port must have at least one peer when the graph is frozen.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::PortAlreadyDeclared`] if `role` already exists on
    /// `component`; the existing port and its connections are left untouched.
    pub fn declare(
        &mut self,
        component: ComponentId,
        role: PortRole,
        owner_path: &str,
        required: bool,
    ) -> Result<PortKey, TopologyError> {
        let key = PortKey::new(component, role);
        match self.ports.entry(key) {
            Entry::Occupied(slot) => Err(TopologyError::PortAlreadyDeclared(
                slot.get().label.clone(),
            )),
            Entry::Vacant(slot) => {
                let _ = slot.insert(PortSlot {
                    label: format!("{owner_path}.{role}"),
                    required,
                    connections: Vec::new(),
                });
                Ok(key)
            }
        }
    }

    /// Human-readable label of a port (`system.cpu0.icache.mem_side`).
    pub fn label(&self, key: PortKey) -> String {
        self.ports
            .get(&key)
            .map_or_else(|| key.to_string(), |slot| slot.label.clone())
    }

    fn endpoint_label(&self, endpoint: PortEndpoint) -> String {
        let label = self.label(endpoint.key);
        match endpoint.key.role.arity() {
            PortArity::Single => label,
            PortArity::Vector => format!("{label}[{}]", endpoint.index),
        }
    }

    /// Connects two ports.
    ///
    /// The arguments may be given in either order; the registry works out which
    /// end initiates.
    ///
    /// # Errors
    ///
    /// * [`TopologyError::UnknownPort`] if either port was never declared.
    /// * [`TopologyError::SelfConnection`] if both ports belong to the same component.
    /// * [`TopologyError::IncompatiblePorts`] if both ports have the same direction.
    /// * [`TopologyError::PortAlreadyConnected`] if a single port already has a peer.
    pub fn connect(&mut self, a: PortKey, b: PortKey) -> Result<Connection, TopologyError> {
        for key in [a, b] {
            if !self.ports.contains_key(&key) {
                return Err(TopologyError::UnknownPort(key.to_string()));
            }
        }
        if a.component == b.component {
            return Err(TopologyError::SelfConnection(self.label(a)));
        }
        if a.role.direction() == b.role.direction() {
            return Err(TopologyError::IncompatiblePorts {
                a: self.label(a),
                b: self.label(b),
                direction: a.role.direction(),
            });
        }
        for key in [a, b] {
            if key.role.arity() == PortArity::Single {
                if let Some(peer) = self.peer(key) {
                    return Err(TopologyError::PortAlreadyConnected {
                        port: self.label(key),
                        peer: self.endpoint_label(peer),
                    });
                }
            }
        }

        let (request, response) = match a.role.direction() {
            PortDirection::Request => (a, b),
            PortDirection::Response => (b, a),
        };
        let connection = Connection {
            request: self.next_endpoint(request),
            response: self.next_endpoint(response),
        };
        let idx = self.connections.len();
        self.connections.push(connection);
        for key in [a, b] {
            if let Some(slot) = self.ports.get_mut(&key) {
                slot.connections.push(idx);
            }
        }
        tracing::debug!(
            from = %self.endpoint_label(connection.request),
            to = %self.endpoint_label(connection.response),
            "connected ports"
        );
        Ok(connection)
    }

    fn next_endpoint(&self, key: PortKey) -> PortEndpoint {
        let index = match key.role.arity() {
            PortArity::Single => 0,
            PortArity::Vector => self.connection_count(key) as u32,
        };
        PortEndpoint { key, index }
    }

    /// The single peer of a port, or the first peer of a vector port.
    pub fn peer(&self, key: PortKey) -> Option<PortEndpoint> {
        self.peers(key).into_iter().next()
    }

    /// All peers of a port in connection order.
    pub fn peers(&self, key: PortKey) -> Vec<PortEndpoint> {
        self.ports.get(&key).map_or_else(Vec::new, |slot| {
            slot.connections
                .iter()
                .filter_map(|&idx| self.connections[idx].other_end(key))
                .collect()
        })
    }

    /// Connections a port takes part in, in the order they were made.
    pub fn connections_of(&self, key: PortKey) -> Vec<Connection> {
        self.ports.get(&key).map_or_else(Vec::new, |slot| {
            slot.connections
                .iter()
                .map(|&idx| self.connections[idx])
                .collect()
        })
    }

    /// Number of connections made on a port.
    pub fn connection_count(&self, key: PortKey) -> usize {
        self.ports.get(&key).map_or(0, |slot| slot.connections.len())
    }

    /// Returns `true` if the port was declared.
    pub fn is_declared(&self, key: PortKey) -> bool {
        self.ports.contains_key(&key)
    }

    /// Every connection in the order it was made.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Declared ports of one component.
    pub fn ports_of(&self, component: ComponentId) -> impl Iterator<Item = PortKey> + '_ {
        self.ports
            .keys()
            .filter(move |key| key.component == component)
            .copied()
    }

    /// Labels of required ports that have no peer.
    pub fn unconnected_required(&self) -> Vec<String> {
        self.ports
            .values()
            .filter(|slot| slot.required && slot.connections.is_empty())
            .map(|slot| slot.label.clone())
            .collect()
    }
}
