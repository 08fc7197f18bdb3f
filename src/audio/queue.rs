use std::collections::{vec_deque, VecDeque};

use super::error::JukeboxError;

/// Cola FIFO con capacidad opcional.
///
/// `None` como capacidad significa cola sin límite. La cola no sabe nada de
/// locks: quien la posee (el estado del jukebox) la protege.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    items: VecDeque<T>,
    capacity: Option<usize>,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
        }
    }

    /// Agrega al final; falla si la cola está llena
    pub fn push_back(&mut self, item: T) -> Result<(), JukeboxError> {
        if let Some(capacity) = self.capacity {
            if self.items.len() >= capacity {
                return Err(JukeboxError::QueueFull { capacity });
            }
        }
        self.items.push_back(item);
        Ok(())
    }

    /// Agrega al final sin mirar la capacidad. Para colas cuyo límite se
    /// impone aguas arriba (backpressure) y no con rechazos.
    pub fn push_unchecked(&mut self, item: T) {
        self.items.push_back(item);
    }

    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Vacía la cola devolviendo los elementos en orden
    pub fn drain(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }

    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[cfg(test)]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    #[cfg(test)]
    pub fn is_full(&self) -> bool {
        self.capacity.is_some_and(|capacity| self.items.len() >= capacity)
    }
}
