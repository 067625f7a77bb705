//! FFR and MFFC derivation.
//!
//! A reverse-topological walk: one FFR/MFFC at a time, each owning a
//! disjoint node set.

use std::collections::HashSet;

use super::node::NodeId;
use super::Netlist;

/// A dense FFR index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FfrId(pub u32);

/// A maximal connected subgraph rooted at a node `root` such that every
/// non-root member has exactly one fanout and that fanout is inside the
/// FFR.
#[derive(Clone, Debug)]
pub struct Ffr {
    pub id: FfrId,
    pub root: NodeId,
    /// All members, including `root`, in ascending-level order.
    pub members: Vec<NodeId>,
}

/// A dense MFFC index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MffcId(pub u32);

/// The transitive fanin closure of an FFR root up to but excluding
/// nodes with fanout reaching outside the cone. An MFFC may absorb
/// several FFRs; its own `root` is the FFR root that was never absorbed
/// into anything else (the "apex").
#[derive(Clone, Debug)]
pub struct Mffc {
    pub id: MffcId,
    pub root: NodeId,
    pub ffrs: Vec<FfrId>,
    /// All nodes transitively owned by this cone, across every member
    /// FFR, in ascending-level order.
    pub nodes: Vec<NodeId>,
}

/// Build the FFR partition of `net`'s non-PPI nodes.
///
/// Processes nodes in descending level order (PPOs first): a node is an
/// FFR root iff its fanout count is not exactly one (a stem with
/// fanout > 1, or a sink with fanout == 0, which every PPO is). A
/// fanout-1 node joins the FFR of its unique fanout, which — by the
/// descending order — has already been assigned one.
pub(super) fn derive_ffrs(net: &Netlist) -> (Vec<Ffr>, Vec<FfrId>) {
    let n = net.nb_nodes();
    let mut node_ffr: Vec<Option<FfrId>> = vec![None; n];
    let mut members: Vec<Vec<NodeId>> = Vec::new();
    let mut roots: Vec<NodeId> = Vec::new();

    let mut order: Vec<NodeId> = net
        .nodes()
        .iter()
        .filter(|node| !node.kind.is_source())
        .map(|node| node.id)
        .collect();
    order.sort_by(|a, b| net.node(*b).level.cmp(&net.node(*a).level));

    for id in order {
        let node = net.node(id);
        if node.fanout.len() != 1 {
            let ffr_id = FfrId(members.len() as u32);
            members.push(vec![id]);
            roots.push(id);
            node_ffr[id.index()] = Some(ffr_id);
        } else {
            let parent = node.fanout[0];
            let ffr_id = node_ffr[parent.index()]
                .expect("fanout processed before its driver in descending-level order");
            members[ffr_id.0 as usize].push(id);
            node_ffr[id.index()] = Some(ffr_id);
        }
    }

    let ffrs: Vec<Ffr> = members
        .into_iter()
        .zip(roots)
        .enumerate()
        .map(|(i, (mut m, root))| {
            m.sort_by_key(|id| net.node(*id).level);
            Ffr {
                id: FfrId(i as u32),
                root,
                members: m,
            }
        })
        .collect();

    let node_ffr: Vec<FfrId> = node_ffr
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            v.unwrap_or_else(|| {
                // PPI/constant nodes have no FFR; use a sentinel that is
                // never dereferenced (every accessor is only ever called
                // on non-PPI nodes).
                debug_assert!(net.node(NodeId(i as u32)).kind.is_source());
                FfrId(u32::MAX)
            })
        })
        .collect();

    (ffrs, node_ffr)
}

/// Build the MFFC partition over FFR roots.
///
/// Processes FFR roots in descending level order. For each unclaimed
/// root, grows a dominance frontier toward the primary inputs: a
/// candidate node is absorbed into the current MFFC iff every one of
/// its fanouts is already a member of that MFFC (the standard
/// "maximal fanout-free cone" fixpoint used by ABC/mockturtle-style
/// tools). Once absorbed, a node cannot be reconsidered by a later
/// (lower-level) apex, since membership is checked against the *global*
/// claimed set as well as the cone being grown.
pub(super) fn derive_mffcs(net: &Netlist) -> (Vec<Mffc>, Vec<MffcId>) {
    let n = net.nb_nodes();
    let mut node_mffc: Vec<Option<MffcId>> = vec![None; n];
    let mut mffcs: Vec<Mffc> = Vec::new();

    let mut roots: Vec<NodeId> = net.ffrs().iter().map(|f| f.root).collect();
    roots.sort_by(|a, b| net.node(*b).level.cmp(&net.node(*a).level));

    for root in roots {
        if node_mffc[root.index()].is_some() {
            continue;
        }
        let mffc_id = MffcId(mffcs.len() as u32);
        let mut cone: HashSet<NodeId> = HashSet::new();
        cone.insert(root);
        let mut stack: Vec<NodeId> = net.node(root).fanin.clone();
        while let Some(cand) = stack.pop() {
            if cone.contains(&cand) || node_mffc[cand.index()].is_some() {
                continue;
            }
            if net.node(cand).kind.is_source() {
                continue;
            }
            let dominated = net
                .node(cand)
                .fanout
                .iter()
                .all(|u| cone.contains(u));
            if dominated {
                cone.insert(cand);
                stack.extend(net.node(cand).fanin.iter().copied());
            }
        }

        let mut ffrs_in_cone: Vec<FfrId> = cone
            .iter()
            .filter(|&&m| net.node(m).id == net.ffr(net.node_ffr(m)).root)
            .map(|&m| net.node_ffr(m))
            .collect();
        ffrs_in_cone.sort();

        let mut nodes: Vec<NodeId> = cone.into_iter().collect();
        nodes.sort_by_key(|id| net.node(*id).level);

        for &id in &nodes {
            node_mffc[id.index()] = Some(mffc_id);
        }

        mffcs.push(Mffc {
            id: mffc_id,
            root,
            ffrs: ffrs_in_cone,
            nodes,
        });
    }

    let node_mffc: Vec<MffcId> = node_mffc
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            v.unwrap_or_else(|| {
                debug_assert!(net.node(NodeId(i as u32)).kind.is_source());
                MffcId(u32::MAX)
            })
        })
        .collect();

    (mffcs, node_mffc)
}
