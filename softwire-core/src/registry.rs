//! Bus instance registry
//!
//! Owns every bus instance of the application in a fixed-capacity arena and
//! hands out [`BusId`]s, so per-instance state never lives in globals.

use heapless::Vec;

use crate::error::BusError;

/// Key of a registered bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusId(u8);

impl BusId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Arena of up to `M` bus instances
pub struct BusRegistry<B, const M: usize> {
    buses: Vec<B, M>,
}

impl<B, const M: usize> Default for BusRegistry<B, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B, const M: usize> BusRegistry<B, M> {
    pub const fn new() -> Self {
        Self { buses: Vec::new() }
    }

    /// Take ownership of a bus
    pub fn register(&mut self, bus: B) -> Result<BusId, BusError> {
        let index = self.buses.len();
        let id = u8::try_from(index).map_err(|_| BusError::RegistryFull)?;
        self.buses.push(bus).map_err(|_| BusError::RegistryFull)?;
        debug!("registered bus {}", index);
        Ok(BusId(id))
    }

    pub fn get(&self, id: BusId) -> Result<&B, BusError> {
        self.buses.get(id.index()).ok_or(BusError::UnknownBus)
    }

    pub fn get_mut(&mut self, id: BusId) -> Result<&mut B, BusError> {
        self.buses.get_mut(id.index()).ok_or(BusError::UnknownBus)
    }

    /// Every registered bus with its id, e.g. to fan one timer out to all
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BusId, &mut B)> {
        self.buses
            .iter_mut()
            .enumerate()
            .map(|(index, bus)| (BusId(index as u8), bus))
    }

    pub fn len(&self) -> usize {
        self.buses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }
}
