//! Helpers for handlers that answer descriptor requests or inspect their own configuration
//! descriptors.

use crate::{Result, UsbDirection, UsbError};
use core::convert::TryFrom;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Standard descriptor type codes.
#[allow(missing_docs)]
pub mod descriptor_type {
    pub const DEVICE: u8 = 1;
    pub const CONFIGURATION: u8 = 2;
    pub const STRING: u8 = 3;
    pub const INTERFACE: u8 = 4;
    pub const ENDPOINT: u8 = 5;
    pub const DEVICE_QUALIFIER: u8 = 6;
    pub const OTHER_SPEED_CONFIGURATION: u8 = 7;
}

/// String descriptor language IDs.
#[allow(missing_docs)]
pub mod lang_id {
    pub const ENGLISH_US: u16 = 0x0409;
}

/// Writes length and type prefixed descriptors into a buffer owned by a handler.
pub struct DescriptorWriter<'a> {
    buf: &'a mut [u8],
    i: usize,
}

impl<'a> DescriptorWriter<'a> {
    /// Creates a writer that starts at the beginning of `buf`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        DescriptorWriter { buf, i: 0 }
    }

    /// Gets the number of bytes written so far.
    pub fn count(&self) -> usize {
        self.i
    }

    /// Gets the bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.i]
    }

    fn write_header(&mut self, length: usize, descriptor_type: u8) -> Result<()> {
        if length + 2 > u8::MAX as usize || self.i + length + 2 > self.buf.len() {
            return Err(UsbError::BufferOverflow);
        }

        self.buf[self.i] = (length + 2) as u8;
        self.buf[self.i + 1] = descriptor_type;
        self.i += 2;

        Ok(())
    }

    /// Writes an arbitrary descriptor. `descriptor` is the body without the two header bytes.
    pub fn write(&mut self, descriptor_type: u8, descriptor: &[u8]) -> Result<()> {
        let length = descriptor.len();

        self.write_header(length, descriptor_type)?;

        self.buf[self.i..self.i + length].copy_from_slice(descriptor);
        self.i += length;

        Ok(())
    }

    /// Writes a string descriptor encoded as UTF-16LE.
    pub fn string(&mut self, string: &str) -> Result<()> {
        let length = string.encode_utf16().count() * 2;

        self.write_header(length, descriptor_type::STRING)?;

        for unit in string.encode_utf16() {
            self.buf[self.i..self.i + 2].copy_from_slice(&unit.to_le_bytes());
            self.i += 2;
        }

        Ok(())
    }

    /// Writes the language ID list that string descriptor zero carries.
    pub fn lang_ids(&mut self, lang_ids: &[u16]) -> Result<()> {
        self.write_header(lang_ids.len() * 2, descriptor_type::STRING)?;

        for id in lang_ids {
            self.buf[self.i..self.i + 2].copy_from_slice(&id.to_le_bytes());
            self.i += 2;
        }

        Ok(())
    }

    /// Writes an endpoint descriptor.
    pub fn endpoint(&mut self, endpoint: &EndpointInfo) -> Result<()> {
        let mps = endpoint.max_packet_size.to_le_bytes();

        self.write(
            descriptor_type::ENDPOINT,
            &[
                endpoint.address,       // bEndpointAddress
                endpoint.ep_type.into(), // bmAttributes
                mps[0],
                mps[1],            // wMaxPacketSize
                endpoint.interval, // bInterval
            ],
        )
    }
}

/// A descriptor found in a descriptor blob.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Descriptor<'a> {
    /// bDescriptorType
    pub descriptor_type: u8,
    /// Descriptor body after the two header bytes.
    pub data: &'a [u8],
}

/// Iterates over the descriptors of a concatenated descriptor blob, such as the answer to a
/// configuration descriptor request.
///
/// A descriptor whose length field is shorter than the header or runs past the end of the blob
/// yields [`UsbError::InvalidDescriptor`] and ends the iteration.
pub struct DescriptorIter<'a> {
    buf: &'a [u8],
}

impl<'a> DescriptorIter<'a> {
    /// Creates an iterator over `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        DescriptorIter { buf }
    }
}

impl<'a> Iterator for DescriptorIter<'a> {
    type Item = Result<Descriptor<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let length = *self.buf.first()? as usize;

        if length < 2 || length > self.buf.len() {
            self.buf = &[];
            return Some(Err(UsbError::InvalidDescriptor));
        }

        let (descriptor, rest) = self.buf.split_at(length);
        self.buf = rest;

        Some(Ok(Descriptor {
            descriptor_type: descriptor[1],
            data: &descriptor[2..],
        }))
    }
}

/// USB endpoint transfer type, as encoded in the two low bits of bmAttributes.
#[repr(u8)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndpointType {
    /// Control endpoint.
    Control = 0b00,
    /// Isochronous endpoint.
    Isochronous = 0b01,
    /// Bulk endpoint.
    Bulk = 0b10,
    /// Interrupt endpoint.
    Interrupt = 0b11,
}

/// The fields of an endpoint descriptor.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndpointInfo {
    /// bEndpointAddress
    pub address: u8,
    /// Transfer type from bmAttributes.
    pub ep_type: EndpointType,
    /// wMaxPacketSize
    pub max_packet_size: u16,
    /// bInterval
    pub interval: u8,
}

impl EndpointInfo {
    /// Gets the direction encoded in the endpoint address.
    pub fn direction(&self) -> UsbDirection {
        UsbDirection::from(self.address)
    }

    /// Gets the endpoint number without the direction bit.
    pub fn number(&self) -> u8 {
        self.address & 0x0f
    }
}

impl TryFrom<Descriptor<'_>> for EndpointInfo {
    type Error = UsbError;

    fn try_from(descriptor: Descriptor<'_>) -> Result<EndpointInfo> {
        if descriptor.descriptor_type != descriptor_type::ENDPOINT || descriptor.data.len() < 5 {
            return Err(UsbError::InvalidDescriptor);
        }

        let d = descriptor.data;

        Ok(EndpointInfo {
            address: d[0],
            ep_type: EndpointType::try_from(d[1] & 0b11).map_err(|_| UsbError::InvalidDescriptor)?,
            max_packet_size: u16::from_le_bytes([d[2], d[3]]),
            interval: d[4],
        })
    }
}

/// Iterates over the endpoint descriptors of a configuration descriptor blob in the order they
/// appear. Other descriptors are skipped.
pub fn endpoints(config: &[u8]) -> impl Iterator<Item = Result<EndpointInfo>> + '_ {
    DescriptorIter::new(config).filter_map(|d| match d {
        Ok(d) if d.descriptor_type == descriptor_type::ENDPOINT => Some(EndpointInfo::try_from(d)),
        Ok(_) => None,
        Err(err) => Some(Err(err)),
    })
}
