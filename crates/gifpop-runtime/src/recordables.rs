//! Observable quantities exposed for recording

use std::fmt;
use std::str::FromStr;

use crate::error::RuntimeError;

/// Named observables of a population, sampled once per step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Recordable {
    /// Membrane potential of the free population (`V_m`)
    #[cfg_attr(feature = "serde", serde(rename = "V_m"))]
    VM,
    /// Number of spikes drawn in the step (`n_events`)
    #[cfg_attr(feature = "serde", serde(rename = "n_events"))]
    NEvents,
    /// Adaptive threshold of the free population (`E_sfa`)
    #[cfg_attr(feature = "serde", serde(rename = "E_sfa"))]
    ESfa,
    /// Expected number of spikes in the step (`mean`)
    #[cfg_attr(feature = "serde", serde(rename = "mean"))]
    Mean,
    /// Filtered excitatory synaptic current (`I_syn_ex`)
    #[cfg_attr(feature = "serde", serde(rename = "I_syn_ex"))]
    ISynEx,
    /// Filtered inhibitory synaptic current (`I_syn_in`)
    #[cfg_attr(feature = "serde", serde(rename = "I_syn_in"))]
    ISynIn,
}

impl Recordable {
    /// All observables, in registry order
    pub const ALL: [Recordable; 6] = [
        Recordable::VM,
        Recordable::NEvents,
        Recordable::ESfa,
        Recordable::Mean,
        Recordable::ISynEx,
        Recordable::ISynIn,
    ];

    /// Registry name
    pub fn name(&self) -> &'static str {
        match self {
            Recordable::VM => "V_m",
            Recordable::NEvents => "n_events",
            Recordable::ESfa => "E_sfa",
            Recordable::Mean => "mean",
            Recordable::ISynEx => "I_syn_ex",
            Recordable::ISynIn => "I_syn_in",
        }
    }
}

impl fmt::Display for Recordable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Recordable {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Recordable::ALL
            .iter()
            .copied()
            .find(|r| r.name() == s)
            .ok_or_else(|| {
                RuntimeError::invalid_parameter(
                    "record",
                    s,
                    "one of V_m, n_events, E_sfa, mean, I_syn_ex, I_syn_in",
                )
            })
    }
}
