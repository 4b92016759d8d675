// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Host lifecycle: create, rename/update and the ordered delete pipeline.

use std::collections::BTreeSet;

use tracing::{debug, info};

use super::Registry;
use crate::constants::{TABLE_CNAMES, TABLE_HOSTS, TABLE_MXS, TABLE_NAPTRS, TABLE_TXTS};
use crate::model::{HinfoPresetId, Host, HostId, HostUpdate, NewHost};
use crate::registry_errors::{RegistryError, Result};
use crate::validators::{validate_email, validate_loc, validate_ttl};

fn validate_contact(contact: &str) -> Result<String> {
    if contact.trim().is_empty() {
        return Ok(String::new());
    }
    Ok(validate_email(contact)?)
}

fn validate_comment(comment: Option<String>) -> Option<String> {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

impl Registry {
    /// Creates a host, optionally together with its first address.
    ///
    /// # Arguments
    ///
    /// * `request` - Host fields; `ip` is attached in the same transaction
    ///
    /// # Errors
    ///
    /// * `Validation` - malformed name, contact, TTL or LOC
    /// * `Conflict` - the name is already used by a host or a CNAME
    /// * `NotFound` - the HINFO preset does not exist
    /// * `Forbidden` - the initial address lies in a frozen network
    pub fn create_host(&mut self, request: NewHost) -> Result<Host> {
        let name = self.validate_owner_name(&request.name)?;
        self.ensure_name_free(&name, None)?;
        let contact = validate_contact(&request.contact)?;
        let ttl = request.ttl.map(validate_ttl).transpose()?;
        let loc = request.loc.as_deref().map(validate_loc).transpose()?;
        if let Some(hinfo) = request.hinfo {
            self.require_hinfo_preset(hinfo)?;
        }
        if let Some(ip) = request.ip {
            self.check_frozen(ip)?;
        }

        let mut tx = self.begin();
        let id = HostId(self.allocate_id());
        let zone = self.zone_index.resolve_name(&name);
        let host = Host {
            id,
            name: name.clone(),
            contact,
            ttl,
            loc,
            comment: validate_comment(request.comment),
            hinfo: request.hinfo,
            zone,
            created_at: tx.now,
            updated_at: tx.now,
        };
        self.host_names.insert(name, id);
        self.state.hosts.insert(id, host.clone());
        tx.saved(TABLE_HOSTS, id, &host);
        tx.touch(zone);

        if let Some(ip) = request.ip {
            self.attach_address(&mut tx, id, ip, None);
        }

        self.commit("create_host", tx);
        info!(host = %host.name, id = %id, "created host");
        Ok(host)
    }

    /// Updates a host. A rename recomputes its zone and refreshes every zone that
    /// renders the old or the new name.
    ///
    /// Contact and comment changes do not dirty any zone.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown host or HINFO preset
    /// * `Conflict` - the new name belongs to another host, a CNAME or a zone nameserver
    /// * `Validation` - malformed fields
    pub fn update_host(&mut self, id: HostId, update: HostUpdate) -> Result<Host> {
        let current = self.require_host(id)?.clone();

        let name = match &update.name {
            Some(name) => {
                let name = self.validate_owner_name(name)?;
                if name != current.name {
                    self.ensure_name_free(&name, Some(id))?;
                    self.ensure_not_zone_nameserver(&name)?;
                }
                name
            }
            None => current.name.clone(),
        };
        let contact = update
            .contact
            .as_deref()
            .map(validate_contact)
            .transpose()?
            .unwrap_or_else(|| current.contact.clone());
        let ttl = match update.ttl {
            Some(ttl) => ttl.map(validate_ttl).transpose()?,
            None => current.ttl,
        };
        let loc = match &update.loc {
            Some(loc) => loc.as_deref().map(validate_loc).transpose()?,
            None => current.loc.clone(),
        };
        let hinfo = update.hinfo.unwrap_or(current.hinfo);
        if let Some(preset) = hinfo {
            self.require_hinfo_preset(preset)?;
        }
        let comment = match update.comment {
            Some(comment) => validate_comment(comment),
            None => current.comment.clone(),
        };

        let renamed = name != current.name;
        let rendered_changed =
            renamed || ttl != current.ttl || loc != current.loc || hinfo != current.hinfo;

        let mut tx = self.begin();
        let mut host = current.clone();
        host.contact = contact;
        host.ttl = ttl;
        host.loc = loc;
        host.hinfo = hinfo;
        host.comment = comment;
        host.updated_at = tx.now;

        if renamed {
            host.zone = self.zone_index.resolve_name(&name);
            host.name = name.clone();
            self.host_names.remove(&current.name);
            self.host_names.insert(name, id);
            debug!(from = %current.name, to = %host.name, zone = ?host.zone, "renaming host");
            self.touch_host_dependants(&mut tx, &current);
        }
        if rendered_changed {
            tx.touch(current.zone);
            tx.touch(host.zone);
        }

        self.state.hosts.insert(id, host.clone());
        tx.saved(TABLE_HOSTS, id, &host);

        if renamed {
            let ips: BTreeSet<_> = self.host_addresses(id).iter().map(|row| row.ip).collect();
            for ip in ips {
                self.ptr_after_insert(&mut tx, ip);
            }
        }

        self.commit("update_host", tx);
        info!(host = %host.name, id = %id, renamed, "updated host");
        Ok(host)
    }

    /// Marks every zone that renders something derived from a host's name.
    fn touch_host_dependants(&self, tx: &mut super::Tx, host: &Host) {
        for row in self.host_addresses(host.id) {
            tx.touch(self.zone_index.resolve_ip(row.ip));
        }
        for ptr in self.state.ptr_overrides.values().filter(|p| p.host == host.id) {
            tx.touch(self.zone_index.resolve_ip(ptr.ip));
        }
        for cname in self.state.cnames.values().filter(|c| c.host == host.id) {
            tx.touch(cname.zone);
        }
        for srv in self.state.srvs.values().filter(|s| s.target == host.name) {
            tx.touch(srv.zone);
        }
    }

    /// Deletes a host and everything attached to it.
    ///
    /// The pipeline runs in a fixed order: PTR overrides targeting the host, CNAMEs,
    /// TXT, NAPTR and MX records, then each address through the PTR delete path, then
    /// the host itself.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown host
    /// * `Forbidden` - one of the host's addresses or overrides lies in a frozen network
    pub fn delete_host(&mut self, id: HostId) -> Result<()> {
        let host = self.require_host(id)?.clone();
        for row in self.host_addresses(id) {
            self.check_frozen(row.ip)?;
        }
        for ptr in self.state.ptr_overrides.values().filter(|p| p.host == id) {
            self.check_frozen(ptr.ip)?;
        }

        let mut tx = self.begin();

        let overrides: Vec<_> = self
            .state
            .ptr_overrides
            .values()
            .filter(|p| p.host == id)
            .map(|p| p.id)
            .collect();
        for ptr in overrides {
            self.remove_ptr_override(&mut tx, ptr);
        }

        let cnames: Vec<_> = self
            .state
            .cnames
            .values()
            .filter(|c| c.host == id)
            .map(|c| c.id)
            .collect();
        for cname_id in cnames {
            if let Some(cname) = self.state.cnames.remove(&cname_id) {
                self.cname_names.remove(&cname.name);
                tx.touch(cname.zone);
                tx.deleted(TABLE_CNAMES, cname_id, &cname);
            }
        }

        let txts: Vec<_> = self
            .state
            .txts
            .values()
            .filter(|t| t.host == id)
            .map(|t| t.id)
            .collect();
        for txt_id in txts {
            if let Some(txt) = self.state.txts.remove(&txt_id) {
                tx.deleted(TABLE_TXTS, txt_id, &txt);
            }
        }
        let naptrs: Vec<_> = self
            .state
            .naptrs
            .values()
            .filter(|n| n.host == id)
            .map(|n| n.id)
            .collect();
        for naptr_id in naptrs {
            if let Some(naptr) = self.state.naptrs.remove(&naptr_id) {
                tx.deleted(TABLE_NAPTRS, naptr_id, &naptr);
            }
        }
        let mxs: Vec<_> = self
            .state
            .mxs
            .values()
            .filter(|m| m.host == id)
            .map(|m| m.id)
            .collect();
        for mx_id in mxs {
            if let Some(mx) = self.state.mxs.remove(&mx_id) {
                tx.deleted(TABLE_MXS, mx_id, &mx);
            }
        }

        let rows: Vec<_> = self.host_addresses(id).iter().map(|row| row.id).collect();
        for row in rows {
            self.detach_address(&mut tx, row);
        }

        self.state.hosts.remove(&id);
        self.host_names.remove(&host.name);
        tx.touch(host.zone);
        tx.deleted(TABLE_HOSTS, id, &host);

        self.commit("delete_host", tx);
        info!(host = %host.name, id = %id, "deleted host");
        Ok(())
    }

    fn require_hinfo_preset(&self, id: HinfoPresetId) -> Result<()> {
        if self.state.hinfo_presets.contains_key(&id) {
            Ok(())
        } else {
            Err(RegistryError::not_found("HinfoPreset", id))
        }
    }
}
