//! Flow paths between nodes.

use mz_core::LinkId;
use mz_elements::{FlowElement, LinkFlow};

/// A flow path connecting two nodes through one owned flow element.
///
/// Positive cached mass flow means from-node → to-node. The cached flow and
/// derivative are whatever the last airflow pass computed; the contaminant
/// solver reads them as frozen boundary data.
#[derive(Debug, Clone)]
pub struct Link {
    pub id: LinkId,
    pub name: String,
    /// Dense index of the upstream-by-convention node.
    pub from: usize,
    /// Dense index of the downstream-by-convention node.
    pub to: usize,
    /// Reference elevation of the opening (m).
    pub elevation: f64,

    element: FlowElement,
    mass_flow: f64,
    derivative: f64,
}

impl Link {
    pub fn new(
        id: LinkId,
        name: impl Into<String>,
        from: usize,
        to: usize,
        elevation: f64,
        element: FlowElement,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            from,
            to,
            elevation,
            element,
            mass_flow: 0.0,
            derivative: 0.0,
        }
    }

    pub fn element(&self) -> &FlowElement {
        &self.element
    }

    pub fn element_mut(&mut self) -> &mut FlowElement {
        &mut self.element
    }

    /// Swap in a replacement element (control-loop clone-modify-replace).
    /// The old element is returned so callers can inspect or drop it.
    pub fn replace_element(&mut self, element: FlowElement) -> FlowElement {
        std::mem::replace(&mut self.element, element)
    }

    pub fn mass_flow(&self) -> f64 {
        self.mass_flow
    }

    pub fn derivative(&self) -> f64 {
        self.derivative
    }

    /// Cache the result of an element evaluation.
    pub fn set_flow(&mut self, flow: LinkFlow) {
        self.mass_flow = flow.mass_flow;
        self.derivative = flow.derivative;
    }
}
