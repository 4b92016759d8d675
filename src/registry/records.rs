// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Attached records: CNAME, TXT, NAPTR, SRV, MX and HINFO presets.
//!
//! Records owned by a host render into the host's zone. CNAME and SRV records carry
//! their own name and therefore their own zone, resolved when they are written.

use tracing::info;

use super::Registry;
use crate::constants::{
    TABLE_CNAMES, TABLE_HINFO_PRESETS, TABLE_MXS, TABLE_NAPTRS, TABLE_SRVS, TABLE_TXTS,
};
use crate::model::{
    Cname, CnameId, CnameUpdate, HinfoPreset, HinfoPresetId, HostId, Mx, MxId, Naptr, NaptrId,
    NewCname, NewMx, NewNaptr, NewSrv, Srv, SrvId, Txt, TxtId, ZoneId,
};
use crate::registry_errors::{RegistryError, Result, ValidationError};
use crate::validators::{
    validate_dns_name, validate_hostname, validate_naptr_flag, validate_non_empty,
    validate_srv_service, validate_ttl, validate_txt, validate_u16,
};

impl Registry {
    fn host_zone(&self, host: HostId) -> Option<ZoneId> {
        self.state.hosts.get(&host).and_then(|h| h.zone)
    }

    // ========================================================================
    // CNAME
    // ========================================================================

    /// Validates a CNAME owner name and returns it with its zone.
    fn validate_cname_name(&self, name: &str, except: Option<CnameId>) -> Result<(String, ZoneId)> {
        let name = validate_hostname(name)?;
        if self.host_names.contains_key(&name) {
            return Err(ValidationError::HostNameConflict { name }.into());
        }
        if let Some(id) = self.cname_names.get(&name) {
            if Some(*id) != except {
                return Err(RegistryError::conflict(
                    "Cname",
                    name,
                    "name is already used by another CNAME",
                ));
            }
        }
        let zone = self
            .zone_index
            .resolve_name(&name)
            .ok_or_else(|| ValidationError::NoZone { name: name.clone() })?;
        Ok((name, zone))
    }

    /// Creates an alias pointing at a host.
    ///
    /// # Errors
    ///
    /// * `Validation(HostNameConflict)` - the name belongs to a host
    /// * `Validation(NoZone)` - no zone contains the name
    /// * `Conflict` - the name is already a CNAME
    /// * `NotFound` - unknown target host
    pub fn create_cname(&mut self, request: NewCname) -> Result<Cname> {
        let (name, zone) = self.validate_cname_name(&request.name, None)?;
        self.require_host(request.host)?;
        let ttl = request.ttl.map(validate_ttl).transpose()?;

        let mut tx = self.begin();
        let cname = Cname {
            id: CnameId(self.allocate_id()),
            name,
            host: request.host,
            ttl,
            zone: Some(zone),
        };
        self.cname_names.insert(cname.name.clone(), cname.id);
        self.state.cnames.insert(cname.id, cname.clone());
        tx.saved(TABLE_CNAMES, cname.id, &cname);
        tx.touch(cname.zone);

        self.commit("create_cname", tx);
        info!(cname = %cname.name, host = %cname.host, "created CNAME");
        Ok(cname)
    }

    /// Renames, re-targets or changes the TTL of a CNAME.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::create_cname`], plus `NotFound` for an unknown CNAME.
    pub fn update_cname(&mut self, id: CnameId, update: CnameUpdate) -> Result<Cname> {
        let current = self
            .state
            .cnames
            .get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("Cname", id))?;
        let (name, zone) = match &update.name {
            Some(name) => {
                let (name, zone) = self.validate_cname_name(name, Some(id))?;
                (name, Some(zone))
            }
            None => (current.name.clone(), current.zone),
        };
        let host = update.host.unwrap_or(current.host);
        self.require_host(host)?;
        let ttl = match update.ttl {
            Some(ttl) => ttl.map(validate_ttl).transpose()?,
            None => current.ttl,
        };

        let mut tx = self.begin();
        let cname = Cname {
            id,
            name,
            host,
            ttl,
            zone,
        };
        if cname.name != current.name {
            self.cname_names.remove(&current.name);
            self.cname_names.insert(cname.name.clone(), id);
        }
        self.state.cnames.insert(id, cname.clone());
        tx.saved(TABLE_CNAMES, id, &cname);
        tx.touch(current.zone);
        tx.touch(cname.zone);

        self.commit("update_cname", tx);
        info!(cname = %cname.name, host = %cname.host, "updated CNAME");
        Ok(cname)
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown CNAME.
    pub fn delete_cname(&mut self, id: CnameId) -> Result<()> {
        if !self.state.cnames.contains_key(&id) {
            return Err(RegistryError::not_found("Cname", id));
        }

        let mut tx = self.begin();
        if let Some(cname) = self.state.cnames.remove(&id) {
            self.cname_names.remove(&cname.name);
            tx.touch(cname.zone);
            tx.deleted(TABLE_CNAMES, id, &cname);
        }
        self.commit("delete_cname", tx);
        info!(id = %id, "deleted CNAME");
        Ok(())
    }

    // ========================================================================
    // TXT
    // ========================================================================

    fn check_txt_unique(&self, host: HostId, txt: &str, except: Option<TxtId>) -> Result<()> {
        let duplicate = self
            .state
            .txts
            .values()
            .any(|t| t.host == host && t.txt == txt && Some(t.id) != except);
        if duplicate {
            return Err(RegistryError::conflict(
                "Txt",
                txt,
                "host already has an identical TXT record",
            ));
        }
        Ok(())
    }

    /// Attaches a TXT record to a host. TXT data is unique per host.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown host
    /// * `Validation(InvalidTxt)` - empty or oversized payload
    /// * `Conflict` - the host already carries the same payload
    pub fn create_txt(&mut self, host: HostId, txt: &str) -> Result<Txt> {
        self.require_host(host)?;
        let txt = validate_txt(txt)?;
        self.check_txt_unique(host, &txt, None)?;

        let mut tx = self.begin();
        let record = Txt {
            id: TxtId(self.allocate_id()),
            host,
            txt,
        };
        self.state.txts.insert(record.id, record.clone());
        tx.saved(TABLE_TXTS, record.id, &record);
        tx.touch(self.host_zone(host));

        self.commit("create_txt", tx);
        info!(host = %host, id = %record.id, "created TXT record");
        Ok(record)
    }

    /// # Errors
    ///
    /// * `NotFound` - unknown TXT record
    /// * `Validation(InvalidTxt)` - empty or oversized payload
    /// * `Conflict` - the host already carries the same payload
    pub fn update_txt(&mut self, id: TxtId, txt: &str) -> Result<Txt> {
        let host = self
            .state
            .txts
            .get(&id)
            .map(|t| t.host)
            .ok_or_else(|| RegistryError::not_found("Txt", id))?;
        let txt = validate_txt(txt)?;
        self.check_txt_unique(host, &txt, Some(id))?;

        let mut tx = self.begin();
        let record = Txt { id, host, txt };
        self.state.txts.insert(id, record.clone());
        tx.saved(TABLE_TXTS, id, &record);
        tx.touch(self.host_zone(host));

        self.commit("update_txt", tx);
        Ok(record)
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown TXT record.
    pub fn delete_txt(&mut self, id: TxtId) -> Result<()> {
        let record = self
            .state
            .txts
            .get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("Txt", id))?;

        let mut tx = self.begin();
        self.state.txts.remove(&id);
        tx.deleted(TABLE_TXTS, id, &record);
        tx.touch(self.host_zone(record.host));
        self.commit("delete_txt", tx);
        Ok(())
    }

    // ========================================================================
    // NAPTR
    // ========================================================================

    /// Attaches a NAPTR record to a host.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown host
    /// * `Validation` - order or preference outside 0..=65535, bad flag, empty
    ///   replacement
    pub fn create_naptr(&mut self, request: NewNaptr) -> Result<Naptr> {
        self.require_host(request.host)?;
        let preference = validate_u16("preference", request.preference)?;
        let order = validate_u16("order", request.order)?;
        let flag = validate_naptr_flag(&request.flag)?;
        let replacement = validate_non_empty("replacement", &request.replacement)?;

        let mut tx = self.begin();
        let record = Naptr {
            id: NaptrId(self.allocate_id()),
            host: request.host,
            preference,
            order,
            flag,
            service: request.service,
            regex: request.regex,
            replacement,
        };
        self.state.naptrs.insert(record.id, record.clone());
        tx.saved(TABLE_NAPTRS, record.id, &record);
        tx.touch(self.host_zone(record.host));

        self.commit("create_naptr", tx);
        info!(host = %record.host, id = %record.id, "created NAPTR record");
        Ok(record)
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown NAPTR record.
    pub fn delete_naptr(&mut self, id: NaptrId) -> Result<()> {
        let record = self
            .state
            .naptrs
            .get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("Naptr", id))?;

        let mut tx = self.begin();
        self.state.naptrs.remove(&id);
        tx.deleted(TABLE_NAPTRS, id, &record);
        tx.touch(self.host_zone(record.host));
        self.commit("delete_naptr", tx);
        Ok(())
    }

    // ========================================================================
    // SRV
    // ========================================================================

    /// Creates a service record. The record lives in the zone containing its name.
    ///
    /// # Errors
    ///
    /// * `Validation(InvalidSrvService)` - name is not `_service._proto.domain`
    /// * `Validation(OutOfRangeU16)` - priority, weight or port out of range
    /// * `Validation(NoZone)` - no zone contains the name
    /// * `Conflict` - an identical record exists
    pub fn create_srv(&mut self, request: NewSrv) -> Result<Srv> {
        let name = validate_srv_service(&request.name)?;
        let priority = validate_u16("priority", request.priority)?;
        let weight = validate_u16("weight", request.weight)?;
        let port = validate_u16("port", request.port)?;
        let ttl = request.ttl.map(validate_ttl).transpose()?;
        let target = validate_dns_name(&request.target)?;
        let zone = self
            .zone_index
            .resolve_name(&name)
            .ok_or_else(|| ValidationError::NoZone { name: name.clone() })?;

        let duplicate = self.state.srvs.values().any(|s| {
            s.name == name
                && s.priority == priority
                && s.weight == weight
                && s.port == port
                && s.target == target
        });
        if duplicate {
            return Err(RegistryError::conflict(
                "Srv",
                name,
                format!("identical record for {priority} {weight} {port} {target} exists"),
            ));
        }

        let mut tx = self.begin();
        let record = Srv {
            id: SrvId(self.allocate_id()),
            name,
            priority,
            weight,
            port,
            ttl,
            target,
            zone: Some(zone),
        };
        self.state.srvs.insert(record.id, record.clone());
        tx.saved(TABLE_SRVS, record.id, &record);
        tx.touch(record.zone);

        self.commit("create_srv", tx);
        info!(srv = %record.name, target = %record.target, "created SRV record");
        Ok(record)
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown SRV record.
    pub fn delete_srv(&mut self, id: SrvId) -> Result<()> {
        let record = self
            .state
            .srvs
            .get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("Srv", id))?;

        let mut tx = self.begin();
        self.state.srvs.remove(&id);
        tx.deleted(TABLE_SRVS, id, &record);
        tx.touch(record.zone);
        self.commit("delete_srv", tx);
        Ok(())
    }

    // ========================================================================
    // MX
    // ========================================================================

    /// Attaches a mail exchange to a host. Unique on (host, priority, exchange).
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown host
    /// * `Validation` - priority out of range or malformed exchange name
    /// * `Conflict` - an identical record exists
    pub fn create_mx(&mut self, request: NewMx) -> Result<Mx> {
        self.require_host(request.host)?;
        let priority = validate_u16("priority", request.priority)?;
        let mx = validate_dns_name(&request.mx)?;
        let duplicate = self
            .state
            .mxs
            .values()
            .any(|m| m.host == request.host && m.priority == priority && m.mx == mx);
        if duplicate {
            return Err(RegistryError::conflict(
                "Mx",
                mx,
                format!("host already has this exchange at priority {priority}"),
            ));
        }

        let mut tx = self.begin();
        let record = Mx {
            id: MxId(self.allocate_id()),
            host: request.host,
            priority,
            mx,
        };
        self.state.mxs.insert(record.id, record.clone());
        tx.saved(TABLE_MXS, record.id, &record);
        tx.touch(self.host_zone(record.host));

        self.commit("create_mx", tx);
        info!(host = %record.host, mx = %record.mx, "created MX record");
        Ok(record)
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown MX record.
    pub fn delete_mx(&mut self, id: MxId) -> Result<()> {
        let record = self
            .state
            .mxs
            .get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("Mx", id))?;

        let mut tx = self.begin();
        self.state.mxs.remove(&id);
        tx.deleted(TABLE_MXS, id, &record);
        tx.touch(self.host_zone(record.host));
        self.commit("delete_mx", tx);
        Ok(())
    }

    // ========================================================================
    // HINFO presets
    // ========================================================================

    /// Creates a reusable HINFO CPU/OS pair.
    ///
    /// # Errors
    ///
    /// * `Validation(EmptyField)` - empty CPU or OS
    /// * `Conflict` - the pair already exists
    pub fn create_hinfo_preset(&mut self, cpu: &str, os: &str) -> Result<HinfoPreset> {
        let cpu = validate_non_empty("cpu", cpu)?;
        let os = validate_non_empty("os", os)?;
        if self
            .state
            .hinfo_presets
            .values()
            .any(|p| p.cpu == cpu && p.os == os)
        {
            return Err(RegistryError::conflict(
                "HinfoPreset",
                format!("{cpu} {os}"),
                "preset already exists",
            ));
        }

        let mut tx = self.begin();
        let preset = HinfoPreset {
            id: HinfoPresetId(self.allocate_id()),
            cpu,
            os,
        };
        self.state.hinfo_presets.insert(preset.id, preset.clone());
        tx.saved(TABLE_HINFO_PRESETS, preset.id, &preset);
        self.commit("create_hinfo_preset", tx);
        Ok(preset)
    }

    /// # Errors
    ///
    /// * `NotFound` - unknown preset
    /// * `Forbidden` - a host still uses the preset
    pub fn delete_hinfo_preset(&mut self, id: HinfoPresetId) -> Result<()> {
        let preset = self
            .state
            .hinfo_presets
            .get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("HinfoPreset", id))?;
        let users = self
            .state
            .hosts
            .values()
            .filter(|h| h.hinfo == Some(id))
            .count();
        if users > 0 {
            return Err(RegistryError::forbidden(
                "HinfoPreset",
                id.to_string(),
                format!("preset is used by {users} host(s)"),
            ));
        }

        let mut tx = self.begin();
        self.state.hinfo_presets.remove(&id);
        tx.deleted(TABLE_HINFO_PRESETS, id, &preset);
        self.commit("delete_hinfo_preset", tx);
        Ok(())
    }
}
